//! Message rendering. Text builders are plain functions so they can be tested without a
//! gateway connection.

use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
};

use crate::{
    dao::models::TriviaQuestionEntity,
    services::{
        leaderboard_service::{Leaderboard, ScoreCard},
        question_service::QuestionCount,
    },
    state::{
        community::Community,
        scheduler::{CadenceChange, RoundExpiry, RoundWin},
    },
};

const QUESTION_COLOUR: u32 = 0xff00ff;
const EXPIRED_COLOUR: u32 = 0xff0000;
const ANSWERED_COLOUR: u32 = 0x00ff00;
const CREATED_COLOUR: u32 = 0x57f287;
const DELETED_COLOUR: u32 = 0xed4245;
const SCORE_COLOUR: u32 = 0x888888;

/// Custom id of the button abandoning a question in progress.
pub const CANCEL_BUTTON: &str = "cancel";
/// Custom id of the button stripping buttons from a message.
pub const CLEAN_BUTTON: &str = "clean";
/// Custom id prefix of the button deleting a stored question.
pub const DELETE_BUTTON_PREFIX: &str = "delete.";

/// Points at which a score gauge is full.
const GAUGE_FULL_POINTS: f64 = 1_000.0;
const GAUGE_WIDTH: usize = 12;

/// Posted trivia question.
pub fn question_embed(question: &TriviaQuestionEntity) -> CreateEmbed {
    CreateEmbed::new()
        .title("**Trivia Question!**")
        .description(&question.question)
        .colour(QUESTION_COLOUR)
        .footer(CreateEmbedFooter::new(
            "You have 2 minutes to answer. You will gain 100 points for whichever server you answer from.",
        ))
}

/// Reply to the winning answer.
pub fn answered_embed(win: &RoundWin) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("**Trivia Answered!**")
        .description(
            "That is correct; congratulations! You have gained 100 points on this server.",
        )
        .colour(ANSWERED_COLOUR);
    match answered_footer(win.interval_reset) {
        Some(footer) => embed.footer(CreateEmbedFooter::new(footer)),
        None => embed,
    }
}

/// Announcement of an unanswered question.
pub fn expired_embed(expiry: &RoundExpiry) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("**Trivia Question Expired.**")
        .description(
            "Nobody answered the trivia question in time, so nobody has been rewarded. Better luck next time!",
        )
        .colour(EXPIRED_COLOUR)
        .field("Answers", bullet_list(&expiry.display_answers), false);
    match expired_footer(expiry.cadence) {
        Some(footer) => embed.footer(CreateEmbedFooter::new(footer)),
        None => embed,
    }
}

/// Footer of the answered embed.
pub fn answered_footer(interval_reset: bool) -> Option<&'static str> {
    interval_reset.then_some("The trivia interval has been reset to normal.")
}

/// Footer of the expired embed.
pub fn expired_footer(cadence: CadenceChange) -> Option<&'static str> {
    match cadence {
        CadenceChange::Reset => {
            Some("Because chat is active enough, the trivia question interval has been reset.")
        }
        CadenceChange::Raised => {
            Some("Due to inactivity, the trivia question interval is being automatically raised.")
        }
        CadenceChange::Unchanged => None,
    }
}

/// Prompt sent after a question was started.
pub fn setup_embed(question: &str, attachment_count: usize) -> CreateEmbed {
    CreateEmbed::new()
        .title("Trivia Question Setup")
        .description(setup_description(question, attachment_count))
}

/// Body of [`setup_embed`].
pub fn setup_description(question: &str, attachment_count: usize) -> String {
    let attachments = match attachment_count {
        0 => String::new(),
        1 => " and 1 attachment".to_owned(),
        count => format!(" and {count} attachments"),
    };
    format!(
        "Initializing a trivia question with question __{question}__{attachments}.\n\n\
         Please enter all valid answers line-by-line in one message. Case-insensitive. \
         Alternatively, press the button below to cancel and submit a new question. \
         Auto-cancel in 5 minutes."
    )
}

/// Buttons under the setup prompt.
pub fn setup_buttons() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(CANCEL_BUTTON)
            .label("CANCEL")
            .style(ButtonStyle::Danger),
    ])
}

/// Confirmation of a saved question.
pub fn created_embed(question: &TriviaQuestionEntity) -> CreateEmbed {
    CreateEmbed::new()
        .title("Trivia Question Created")
        .colour(CREATED_COLOUR)
        .field("Question", &question.question, false)
        .field("Answers", code_list(&question.answers), false)
        .footer(CreateEmbedFooter::new(
            "Press the button below to delete this question at any time.",
        ))
}

/// Buttons under the created confirmation.
pub fn created_buttons(question_id: &str) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(format!("{DELETE_BUTTON_PREFIX}{question_id}"))
            .label("DELETE")
            .style(ButtonStyle::Danger),
        CreateButton::new(CLEAN_BUTTON)
            .label("REMOVE BUTTONS")
            .style(ButtonStyle::Success),
    ])
}

/// Replacement for the created confirmation once the question is deleted.
pub fn deleted_embed(question: &TriviaQuestionEntity) -> CreateEmbed {
    CreateEmbed::new()
        .title("Trivia Question Deleted")
        .colour(DELETED_COLOUR)
        .field("Question", &question.question, false)
        .field("Answers", code_list(&question.answers), false)
}

/// One `%search` hit.
pub fn search_embed(question: &TriviaQuestionEntity) -> CreateEmbed {
    CreateEmbed::new()
        .description(format!("**{}**", question.question))
        .field("Answers", bullet_list(&question.answers), false)
        .footer(CreateEmbedFooter::new(format!("ID: {}", question.id)))
}

/// `%help`
pub fn help_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("**Itto vs. Shenhe | Noodle-Eating Contest Judge**")
        .description(
            "I am the bot responsible for counting messages for part 2 of the Itto Mains × Shenhe Mains collab event. \
             Messages are worth up to 10 points, with the number of points granted decreasing based on how recently you sent your last message. \
             If your last message was 40 or more seconds ago, you will receive 10 points. \
             Otherwise, linear scaling will be applied, so if you wait 20 seconds, you will receive 5 points. \
             This adjustment is global. \
             This discourages spamming while not punishing users who send multiple messages legitimately.\n\n\
             `%help` - this command\n\
             `%score [user]` - view your own points (in both servers)\n\
             `%leaderboard [page]` - view the points leaderboard and the servers' scores so far\n\n\
             `%disqualify <id>` - (moderator only) disqualify a user, preventing their points from counting towards anything\n\
             `%pardon <id>` - (moderator only) remove a user's disqualification",
        )
        .footer(CreateEmbedFooter::new(
            "Note: While a user is disqualified, their messages still count for points, so if you pardon someone later, they are essentially unaffected.",
        ))
}

/// `%leaderboard`
pub fn leaderboard_embed(board: &Leaderboard) -> CreateEmbed {
    CreateEmbed::new()
        .title("**Noodle-Eating Contest | Leaderboard**")
        .description(leaderboard_description(board))
        .footer(CreateEmbedFooter::new(
            "The bolded number is for this server and the bracketed number is for the other server.",
        ))
}

/// Body of [`leaderboard_embed`].
pub fn leaderboard_description(board: &Leaderboard) -> String {
    let other = board.community.other();
    let rows = board
        .rows
        .iter()
        .map(|row| {
            format!(
                "<@{}> - **{}** ({})",
                row.user,
                row.points.floor(),
                row.other_points.floor()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "**{} Mains: {} points\n{} Mains: {} points**\n\n{rows}",
        board.community.title(),
        board.total.floor(),
        other.title(),
        board.other_total.floor(),
    )
}

/// `%score`
pub fn score_embed(card: &ScoreCard, name: &str, avatar_url: Option<String>) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(name)
        .colour(if card.disqualified {
            EXPIRED_COLOUR
        } else {
            SCORE_COLOUR
        });
    for community in Community::ALL {
        let points = card.points(community);
        embed = embed.field(
            community.label(),
            format!("`{}` **{}**", gauge(points), points.floor()),
            false,
        );
    }
    match avatar_url {
        Some(url) => embed.thumbnail(url),
        None => embed,
    }
}

/// Text accompanying a disqualified user's score card.
pub fn disqualified_notice(card: &ScoreCard, own_card: bool) -> Option<&'static str> {
    match (card.disqualified, own_card) {
        (false, _) => None,
        (true, true) => Some("You are disqualified."),
        (true, false) => Some("This user is disqualified."),
    }
}

/// Progress bar scaled so that [`GAUGE_FULL_POINTS`] fills it.
pub fn gauge(points: f64) -> String {
    let ratio = (points / GAUGE_FULL_POINTS).clamp(0.0, 1.0);
    let filled = (ratio * GAUGE_WIDTH as f64).round() as usize;
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(GAUGE_WIDTH - filled));
    bar
}

/// Reply to `%disqualify` / `%pardon`.
pub fn moderation_reply(disqualified: bool, user: u64) -> String {
    let verb = if disqualified {
        "Disqualified"
    } else {
        "Pardoned"
    };
    format!("{verb} <@{user}>.")
}

/// Reply to `%cd`.
pub fn cooldown_reply(minutes: u32) -> String {
    let plural = if minutes == 1 { "" } else { "s" };
    format!("Set the trivia cooldown to {minutes} minute{plural}")
}

/// Reply to `%count`.
pub fn count_reply(count: QuestionCount) -> String {
    format!(
        "{} unused questions left ({} total).",
        count.unused, count.total
    )
}

/// One `- answer` line per answer.
pub fn bullet_list(answers: &[String]) -> String {
    answers
        .iter()
        .map(|answer| format!("- {answer}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Answers as comma separated inline code.
pub fn code_list(answers: &[String]) -> String {
    answers
        .iter()
        .map(|answer| format!("`{answer}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::leaderboard_service::LeaderboardRow;

    #[test]
    fn setup_mentions_attachments_only_when_present() {
        assert!(setup_description("2+2?", 0).starts_with(
            "Initializing a trivia question with question __2+2?__.\n\n"
        ));
        assert!(setup_description("q", 1).contains("__q__ and 1 attachment."));
        assert!(setup_description("q", 3).contains("__q__ and 3 attachments."));
    }

    #[test]
    fn leaderboard_floors_points() {
        let board = Leaderboard {
            community: Community::Shenhe,
            total: 120.75,
            other_total: 99.9,
            rows: vec![LeaderboardRow {
                user: 5,
                points: 120.75,
                other_points: 3.2,
            }],
        };
        assert_eq!(
            leaderboard_description(&board),
            "**Shenhe Mains: 120 points\nItto Mains: 99 points**\n\n<@5> - **120** (3)"
        );
    }

    #[test]
    fn footers_follow_the_cadence() {
        assert_eq!(expired_footer(CadenceChange::Unchanged), None);
        assert!(expired_footer(CadenceChange::Raised).unwrap().starts_with("Due to inactivity"));
        assert!(expired_footer(CadenceChange::Reset).unwrap().contains("has been reset"));
        assert_eq!(answered_footer(false), None);
    }

    #[test]
    fn gauge_is_capped_at_full() {
        assert_eq!(gauge(0.0), "░".repeat(GAUGE_WIDTH));
        assert_eq!(gauge(5_000.0), "█".repeat(GAUGE_WIDTH));
        assert_eq!(gauge(500.0).chars().filter(|c| *c == '█').count(), GAUGE_WIDTH / 2);
    }

    #[test]
    fn replies_match_the_bot_wording() {
        assert_eq!(cooldown_reply(1), "Set the trivia cooldown to 1 minute");
        assert_eq!(cooldown_reply(5), "Set the trivia cooldown to 5 minutes");
        assert_eq!(moderation_reply(true, 9), "Disqualified <@9>.");
        assert_eq!(moderation_reply(false, 9), "Pardoned <@9>.");
        assert_eq!(
            count_reply(QuestionCount {
                unused: 3,
                total: 10
            }),
            "3 unused questions left (10 total)."
        );
        assert_eq!(bullet_list(&["a".into(), "b".into()]), "- a\n- b");
        assert_eq!(code_list(&["a".into(), "b".into()]), "`a`, `b`");
    }

    #[test]
    fn disqualified_notice_depends_on_the_target() {
        let card = ScoreCard {
            user: 1,
            itto: 0.0,
            shenhe: 0.0,
            disqualified: true,
        };
        assert_eq!(disqualified_notice(&card, true), Some("You are disqualified."));
        assert_eq!(
            disqualified_notice(&card, false),
            Some("This user is disqualified.")
        );
    }
}
