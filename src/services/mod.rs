/// Trivia authoring over direct messages.
pub mod authoring_service;
/// Health check service.
pub mod health_service;
/// Leaderboard and score card queries.
pub mod leaderboard_service;
/// Moderator operations on the question bank.
pub mod question_service;
/// Disqualification registry.
pub mod registry_service;
/// Activity scoring of channel messages.
pub mod scoring_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Trivia scheduling loop and answer resolution.
pub mod trivia_service;
