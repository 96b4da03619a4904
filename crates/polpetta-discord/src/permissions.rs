//! Permission bitfield helpers.
//!
//! Discord serializes role permissions as a decimal string; the only bit the
//! bot cares about is ADMINISTRATOR, used to gate the config commands and to
//! refuse handing out admin-granting roles.

use crate::types::{Member, Role};

/// The ADMINISTRATOR permission bit.
pub const ADMINISTRATOR: u64 = 1 << 3;

/// Whether the given role grants the ADMINISTRATOR permission.
///
/// An unparseable permission string is treated as granting nothing.
pub fn role_grants_admin(role: &Role) -> bool {
    role.permissions
        .parse::<u64>()
        .map(|bits| bits & ADMINISTRATOR != 0)
        .unwrap_or(false)
}

/// Whether the member holds any role granting ADMINISTRATOR.
pub fn member_is_admin(member: &Member, guild_roles: &[Role]) -> bool {
    member.roles.iter().any(|role_id| {
        guild_roles
            .iter()
            .filter(|r| &r.id == role_id)
            .any(role_grants_admin)
    })
}
