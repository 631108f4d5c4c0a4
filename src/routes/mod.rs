/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// so a protected endpoint can never be exposed by accident.
///
/// The three modules map directly to the defined access tiers.

/// Routes accessible without authentication. Read handlers here still accept an
/// optional identity so visibility scoping applies per requester.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated user session.
pub mod authenticated;

/// Routes restricted exclusively to users with the ADMIN role.
/// Implements mandatory authorization checks.
pub mod admin;
