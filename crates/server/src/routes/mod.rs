pub mod auth;
pub mod connection;
pub mod cron;
pub mod health;
pub mod invites;
pub mod prompts;
