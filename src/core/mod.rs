pub mod analyzer;
pub mod corpus;
pub mod formatter;
pub mod history;
pub mod leaderboard;
pub mod markov;
pub mod pipeline;
