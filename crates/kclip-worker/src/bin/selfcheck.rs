use std::path::Path;

use kclip_media::check_tool;
use kclip_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();
    config.validate()?;

    println!(
        "kclip-selfcheck: starting with output_dir={}",
        config.output_dir.display()
    );
    ensure_output_dir(&config.output_dir).await?;
    for program in [
        &config.programs.downloader,
        &config.programs.ffmpeg,
        &config.programs.compressor,
    ] {
        let path = check_tool(program)?;
        println!("kclip-selfcheck: {} -> {}", program, path.display());
    }
    if let Some(catalog) = &config.catalog_path {
        ensure_readable(catalog)?;
    }

    println!("kclip-selfcheck: ok");
    Ok(())
}

async fn ensure_output_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path.as_ref()).await?;
    Ok(())
}

fn ensure_readable(path: &Path) -> anyhow::Result<()> {
    std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("catalog {} not readable: {}", path.display(), e))?;
    Ok(())
}
