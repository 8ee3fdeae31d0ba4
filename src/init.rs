use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

pub async fn ensure_work_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create work dir {}", dir.display()))?;
        crate::logi(format!("Created directory: {}", dir.display()));
    }
    Ok(())
}

pub async fn check_tool(bin: &str) -> bool {
    match tokio::process::Command::new(bin)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
