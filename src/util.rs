use uuid::Uuid;

/// `<prefix>-<8 hex chars>`. Best-effort unique; callers don't rely on it.
pub fn generate_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8])
}
