//! Domain services for invite codes and admin accounts.
//!
//! Services contain business logic that operates on domain models and reach
//! storage only through the traits in [`crate::store`].

pub mod admin_accounts;
pub mod csv_export;
pub mod invite_codes;

pub use admin_accounts::AdminAccountService;
pub use csv_export::{export_filename, render_invite_codes_csv, CSV_HEADER, UTF8_BOM};
pub use invite_codes::{CodeGenerator, InviteCodeService, MAX_GENERATION_ATTEMPTS};
