//! Text command parsing. Parsing never touches state; malformed arguments become a
//! `Usage` variant carrying the reply.

const SCORE_USAGE: &str = "Usage: `%score` (yourself) / `%score [mention / ID]`";
const LEADERBOARD_USAGE: &str = "Usage: `%leaderboard` (page 1) / `%leaderboard [page]`";
const COOLDOWN_USAGE: &str = "Expected a positive integer.";
const DELETE_USAGE: &str = "Usage: `%delete <id>`";

/// Commands available in the community servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunityCommand {
    /// `%help`
    Help,
    /// `%score [user]`; `None` means the author.
    Score(Option<u64>),
    /// `%leaderboard [page]`, 1-based.
    Leaderboard {
        /// Requested page.
        page: usize,
    },
    /// `%disqualify <user>`
    Disqualify(u64),
    /// `%pardon <user>`
    Pardon(u64),
    /// Recognized command with malformed arguments.
    Usage(String),
}

impl CommunityCommand {
    /// Parse a guild message. Returns `None` for anything that is not a community command.
    pub fn parse(content: &str) -> Option<Self> {
        let mut tokens = content.split_whitespace();
        let name = tokens.next()?;
        let args: Vec<&str> = tokens.collect();

        let command = match name {
            "%help" => CommunityCommand::Help,
            "%score" => match args.as_slice() {
                [] => CommunityCommand::Score(None),
                [target] => match parse_user_ref(target) {
                    Some(user) => CommunityCommand::Score(Some(user)),
                    None => CommunityCommand::Usage(SCORE_USAGE.into()),
                },
                _ => CommunityCommand::Usage(SCORE_USAGE.into()),
            },
            "%leaderboard" => match args.as_slice() {
                [] => CommunityCommand::Leaderboard { page: 1 },
                [page] => match page.parse::<usize>() {
                    Ok(page) if page > 0 => CommunityCommand::Leaderboard { page },
                    _ => CommunityCommand::Usage(LEADERBOARD_USAGE.into()),
                },
                _ => CommunityCommand::Usage(LEADERBOARD_USAGE.into()),
            },
            "%disqualify" | "%pardon" => {
                let user = match args.as_slice() {
                    [target] => parse_user_ref(target),
                    _ => None,
                };
                match (name, user) {
                    ("%disqualify", Some(user)) => CommunityCommand::Disqualify(user),
                    (_, Some(user)) => CommunityCommand::Pardon(user),
                    (_, None) => CommunityCommand::Usage(format!("Usage: `{name} [mention / ID]`")),
                }
            }
            _ => return None,
        };
        Some(command)
    }
}

/// Whether `content` invokes a command reserved to members with the BAN_MEMBERS
/// permission, whether or not its arguments are valid.
pub fn requires_ban_permission(content: &str) -> bool {
    matches!(
        content.split_whitespace().next(),
        Some("%disqualify" | "%pardon")
    )
}

/// Commands available to trivia authors over DM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeratorCommand {
    /// `%start`
    Start,
    /// `%cd <minutes>`
    Cooldown(u32),
    /// `%list`
    List,
    /// `%count`
    Count,
    /// `%delete <id>`
    Delete(String),
    /// `%search <text>`
    Search(String),
    /// Recognized command with malformed arguments.
    Usage(String),
}

impl ModeratorCommand {
    /// Parse a direct message. Returns `None` for anything else, which then feeds the
    /// authoring workflow.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim();
        let (name, rest) = content
            .split_once(char::is_whitespace)
            .map(|(name, rest)| (name, rest.trim()))
            .unwrap_or((content, ""));

        let command = match (name, rest) {
            ("%start", "") => ModeratorCommand::Start,
            ("%list", "") => ModeratorCommand::List,
            ("%count", "") => ModeratorCommand::Count,
            ("%cd", minutes) => match minutes.parse::<u32>() {
                Ok(minutes) if minutes > 0 => ModeratorCommand::Cooldown(minutes),
                _ => ModeratorCommand::Usage(COOLDOWN_USAGE.into()),
            },
            ("%delete", "") => ModeratorCommand::Usage(DELETE_USAGE.into()),
            ("%delete", id) => ModeratorCommand::Delete(id.to_owned()),
            ("%search", text) => ModeratorCommand::Search(text.to_lowercase()),
            _ => return None,
        };
        Some(command)
    }
}

/// Accepts a raw id or a user mention (`<@id>` / `<@!id>`).
pub fn parse_user_ref(token: &str) -> Option<u64> {
    let digits = match token.strip_prefix("<@") {
        Some(mention) => {
            let mention = mention.strip_suffix('>')?;
            mention.strip_prefix('!').unwrap_or(mention)
        }
        None => token,
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
