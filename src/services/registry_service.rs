use tracing::info;

use crate::{dao::contest_store::ContestStore, error::ServiceError};

/// Users excluded from the contest regardless of their stored record.
const STATIC_DISQUALIFIED: [u64; 41] = [
    815842845226303518,
    537773793939030016,
    212302695334150145,
    281299190502391819,
    429804945378770955,
    321071333083709442,
    179343867902951424,
    277682661320032257,
    291643360635256832,
    388195202751397893,
    211496188678111234,
    494660779358945290,
    419282969497305119,
    802825258138468384,
    251082987360223233,
    618573012588953601,
    588681632404471808,
    440723536814800899,
    725030980053631008,
    94978723341668352,
    440958061729939456,
    609371475547521024,
    399947802471563275,
    893961055968063578,
    209617229216612352,
    703999474673909870,
    495842927550005268,
    115696298539089923,
    369975025609998337,
    474489885680730113,
    300985931740217344,
    548937692273049658,
    699690024576221264,
    143615626785587200,
    753141485922287658,
    272390122748641280,
    218330525012590592,
    716983438401601539,
    307047594063036416,
    254750430087610379,
    402074274082586628,
];

/// Whether `user` is on the compiled-in exclusion list.
pub fn is_statically_disqualified(user: u64) -> bool {
    STATIC_DISQUALIFIED.contains(&user)
}

/// Whether `user` is excluded from aggregation and trivia rewards, either statically or
/// by a moderator.
pub async fn is_disqualified(store: &dyn ContestStore, user: u64) -> Result<bool, ServiceError> {
    if is_statically_disqualified(user) {
        return Ok(true);
    }
    let record = store.find_score(user).await?;
    Ok(record.is_some_and(|record| record.dq))
}

/// Persist a moderator's decision. Points keep accruing either way.
pub async fn set_disqualified(
    store: &dyn ContestStore,
    user: u64,
    disqualified: bool,
) -> Result<(), ServiceError> {
    store.set_disqualified(user, disqualified).await?;
    info!(user, disqualified, "updated disqualification");
    Ok(())
}
