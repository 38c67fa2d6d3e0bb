//! Schema migration command.
//!
//! Opening a backend applies any pending migrations; this command does only
//! that and reports which backend it touched.

pub(crate) async fn run() -> anyhow::Result<()> {
    let backend = crate::open_storage().await?;
    println!("{} schema is up to date", backend.name());
    Ok(())
}
