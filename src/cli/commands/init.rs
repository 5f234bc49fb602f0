//! Initialize command.

use console::style;

use clausewise::config::Settings;

/// Create the data directory layout.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    println!(
        "{} Initialized clausewise in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  documents: {}", settings.processed_dir.display());
    println!("  batches:   {}", settings.batches_dir.display());
    println!("  versions:  {}", settings.versions_dir.display());

    Ok(())
}
