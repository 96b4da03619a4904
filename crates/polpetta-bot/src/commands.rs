//! Slash-command reply handlers.
//!
//! The gateway connection and option parsing live outside this workspace;
//! each handler takes already-extracted arguments and returns the reply text
//! the glue should send. Storage failures become apologetic replies, never
//! panics.

use chrono::{DateTime, Utc};

use polpetta_discord::{Member, Role, channel_mention, permissions, user_mention};

use crate::calendar::{self, DAY_EXAMPLE, DAY_FORMAT, MonthDay};
use crate::cooldown::CooldownActive;
use crate::service::{ForgetOutcome, MeatballService, SaveOutcome};

const PRETTY_DATE_FORMAT: &str = "%Y-%m-%d";
const PRETTY_TIME_FORMAT: &str = "%H:%M:%S";

fn invalid_date_reply() -> String {
    format!(
        "Invalid date given! Make sure you use {} format. For example: {} (2nd January).",
        DAY_FORMAT, DAY_EXAMPLE
    )
}

fn cooldown_reply(active: &CooldownActive) -> String {
    format!(
        "You last changed your meatball day on {} at {}. You can change it again after {} at {} UTC.",
        active.last_write.format(PRETTY_DATE_FORMAT),
        active.last_write.format(PRETTY_TIME_FORMAT),
        active.next_eligible.format(PRETTY_DATE_FORMAT),
        active.next_eligible.format(PRETTY_TIME_FORMAT),
    )
}

/// Look up a member's meatball day (their own, or another user's).
pub fn lookup(service: &MeatballService, guild_id: &str, target_user_id: &str) -> String {
    match service.lookup_day(guild_id, target_user_id) {
        Ok(Some(day)) => format!(
            "I've got {}'s meatball day down as {}.",
            user_mention(target_user_id),
            calendar::pretty_day(&day)
        ),
        Ok(None) => format!(
            "{} hasn't registered their meatball day with me yet.",
            user_mention(target_user_id)
        ),
        Err(e) => format!("I couldn't check my database: {}. Please try again later.", e),
    }
}

/// Save the invoker's meatball day from `MM-DD` input.
pub async fn save(
    service: &MeatballService,
    guild_id: &str,
    user_id: &str,
    input: &str,
    now: DateTime<Utc>,
) -> String {
    // Loose split here; the service owns calendar validation.
    let Some((month, day)) = input.trim().split_once('-') else {
        return invalid_date_reply();
    };
    let (Ok(month), Ok(day)) = (month.parse::<u8>(), day.parse::<u8>()) else {
        return invalid_date_reply();
    };

    match service.save_day(guild_id, user_id, month, day, now).await {
        Ok(SaveOutcome::Saved(record)) => format!(
            "Saved {} as {}'s meatball day.",
            calendar::pretty_day(&record),
            user_mention(user_id)
        ),
        Ok(SaveOutcome::OnCooldown(active)) => cooldown_reply(&active),
        Ok(SaveOutcome::InvalidDate(_)) => invalid_date_reply(),
        Err(e) => format!(
            "Failed to set {}'s meatball day: {}",
            user_mention(user_id),
            e
        ),
    }
}

/// Remove the invoker's meatball day.
pub fn forget(
    service: &MeatballService,
    guild_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> String {
    match service.forget_day(guild_id, user_id, now) {
        Ok(ForgetOutcome::Forgotten) => {
            "I have erased your meatball day from my database.".to_string()
        }
        Ok(ForgetOutcome::OnCooldown(active)) => cooldown_reply(&active),
        Ok(ForgetOutcome::NotRegistered) => {
            "I don't seem to have your meatball day on record. \
             Isn't that a lovely coincidence?"
                .to_string()
        }
        Err(e) => format!(
            "I'm unable to delete your meatball day from my database: {}\n\
             Please contact an admin to resolve this issue.",
            e
        ),
    }
}

/// Set the role to assign on meatball days. Admin only; refuses roles that
/// themselves grant admin.
pub fn set_role(
    service: &MeatballService,
    guild_id: &str,
    invoker: &Member,
    guild_roles: &[Role],
    role: &Role,
) -> String {
    if !permissions::member_is_admin(invoker, guild_roles) {
        return "Nice try.".to_string();
    }

    if permissions::role_grants_admin(role) {
        return "That role allows admin permissions, that's a bad idea.".to_string();
    }

    match service.set_role(guild_id, &role.id) {
        Ok(()) => format!("I will now assign {} on meatball day.", role.mention()),
        Err(e) => format!("Failed to set new role: {}", e),
    }
}

/// Set the channel used for announcements. Admin only.
pub fn set_channel(
    service: &MeatballService,
    guild_id: &str,
    invoker: &Member,
    guild_roles: &[Role],
    channel_id: &str,
) -> String {
    if !permissions::member_is_admin(invoker, guild_roles) {
        return "Nice try.".to_string();
    }

    match service.set_channel(guild_id, channel_id) {
        Ok(()) => format!(
            "I will now use {} for announcements.",
            channel_mention(channel_id)
        ),
        Err(e) => format!("Failed to set new channel: {}", e),
    }
}

/// Report the next upcoming meatball day in the guild.
pub fn next_day(service: &MeatballService, guild_id: &str, today: MonthDay) -> String {
    match service.next_upcoming_day(guild_id, today) {
        Ok(Some(day)) => format!(
            "The next meatball day is {}'s, on {}.",
            user_mention(&day.user_id),
            calendar::pretty_day(&day)
        ),
        Ok(None) => "Nobody here has registered a meatball day with me yet.".to_string(),
        Err(e) => format!("I couldn't check my database: {}. Please try again later.", e),
    }
}
