/// Site resolution and depth aggregation.
///
/// Submodules:
/// - `geodesy`   — great-circle distance between coordinates.
/// - `groupings` — clusters a flat reading set into sampling sites.
/// - `profiles`  — reduces one site's readings into a depth profile.

pub mod geodesy;
pub mod groupings;
pub mod profiles;
