//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Name,
    UserType,
    AvatarUrl,
    ApiKeyHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum InviteCodes {
    Table,
    Code,
    OwnerId,
    CreatedAt,
    ExpiresAt,
    UsedAt,
    UsedBy,
}

#[derive(Iden)]
pub enum FamilyConnections {
    Table,
    Id,
    PartyA,
    PartyB,
    ConnectedAt,
}

#[derive(Iden)]
pub enum ConnectionMembers {
    Table,
    UserId,
    ConnectionId,
}

#[derive(Iden)]
pub enum Streaks {
    Table,
    ConnectionId,
    CurrentStreakDays,
    LongestStreakDays,
    LastInteractionDate,
    LastInteractionAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum Interactions {
    Table,
    Id,
    ConnectionId,
    UserId,
    Kind,
    Day,
    OccurredAt,
}

#[derive(Iden)]
pub enum StreakReminders {
    Table,
    Id,
    ConnectionId,
    ReminderDate,
    CurrentStreakDays,
    CreatedAt,
}

#[derive(Iden)]
pub enum DailyPrompts {
    Table,
    Date,
    PromptText,
    GeneratedBy,
    CreatedAt,
}
