use cq_atlas::metadata::{load_atlas_metadata_from_path, AtlasMetadata};
use cq_atlas::{build_atlas, AtlasConfig, ImageSource, SpriteAtlas};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

struct ToolArgs {
    input: String,
    png_output: PathBuf,
    json_output: PathBuf,
    config: AtlasConfig,
}

fn usage() -> String {
    "Usage: cargo run -p cq_atlas_tool -- <sheet_image> <atlas_png_output> <atlas_json_output> [columns]\nExample: cargo run -p cq_atlas_tool -- assets/hero_sheet.png assets/generated/hero.png assets/generated/hero.json 4".to_string()
}

fn parse_args(args: &[String]) -> Result<ToolArgs, String> {
    if args.len() < 4 || args.len() > 5 {
        return Err(usage());
    }
    let mut config = AtlasConfig::default();
    if let Some(raw) = args.get(4) {
        config.columns = raw
            .parse::<u32>()
            .map_err(|e| format!("Invalid columns '{raw}': {e}"))?;
    }
    Ok(ToolArgs {
        input: args[1].clone(),
        png_output: PathBuf::from(&args[2]),
        json_output: PathBuf::from(&args[3]),
        config,
    })
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let tool_args = parse_args(&args)?;
    let metadata = export_atlas(&tool_args)?;

    println!(
        "Exported atlas {} ({}x{} frames) -> {} and {}",
        metadata.atlas_id,
        metadata.frame_width,
        metadata.frame_height,
        tool_args.png_output.display(),
        tool_args.json_output.display()
    );
    Ok(())
}

fn export_atlas(args: &ToolArgs) -> Result<AtlasMetadata, String> {
    let source = ImageSource::from_reference(&args.input);
    let atlas = build_atlas(&source, &args.config).map_err(|e| e.to_string())?;
    log::info!(
        "Matted {} background pixels from {}",
        atlas.cleared_pixels,
        source.describe()
    );

    let mut png = Vec::new();
    atlas
        .image()
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| format!("Failed to encode atlas PNG: {e}"))?;
    let metadata = atlas_metadata(&atlas, &args.png_output);
    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| format!("Failed to serialize atlas metadata: {e}"))?;

    let mut outputs = StagedOutputs::default();
    outputs.stage(&args.png_output, &png)?;
    outputs.stage(&args.json_output, json.as_bytes())?;
    outputs.commit()?;

    // Read back through the runtime loader so a bad export fails here.
    load_atlas_metadata_from_path(&args.json_output)
}

fn atlas_metadata(atlas: &SpriteAtlas, png_output: &Path) -> AtlasMetadata {
    let atlas_id = pixel_digest(atlas.image().as_raw());
    let texture = png_output.to_string_lossy().replace('\\', "/");
    AtlasMetadata::from_atlas(atlas, &atlas_id, &texture)
}

fn pixel_digest(rgba: &[u8]) -> String {
    format!("{:x}", Sha256::digest(rgba))
}

fn sibling_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    target.with_file_name(name)
}

/// Files written next to their targets as `<name>.partial` and moved into
/// place together. Anything still staged when this is dropped is deleted.
#[derive(Default)]
struct StagedOutputs {
    /// (staged, target) pairs in commit order.
    entries: Vec<(PathBuf, PathBuf)>,
}

impl StagedOutputs {
    fn stage(&mut self, target: &Path, bytes: &[u8]) -> Result<(), String> {
        if let Some(dir) = target.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create output dir '{}': {e}", dir.display()))?;
        }
        let staged = sibling_path(target, "partial");
        // Track before writing so a half-written file is cleaned up too.
        self.entries.push((staged.clone(), target.to_path_buf()));
        fs::write(&staged, bytes)
            .map_err(|e| format!("Failed to write '{}': {e}", staged.display()))
    }

    /// Replace every target with its staged file. If any move fails, the
    /// targets already replaced get their previous contents back.
    fn commit(mut self) -> Result<(), String> {
        let entries = std::mem::take(&mut self.entries);
        let mut replaced: Vec<(PathBuf, Option<PathBuf>)> = Vec::new();

        for (index, (staged, target)) in entries.iter().enumerate() {
            match replace_target(staged, target) {
                Ok(previous) => replaced.push((target.clone(), previous)),
                Err(err) => {
                    for (target, previous) in replaced.iter().rev() {
                        let _ = fs::remove_file(target);
                        if let Some(previous) = previous {
                            let _ = fs::rename(previous, target);
                        }
                    }
                    for (staged, _) in &entries[index..] {
                        let _ = fs::remove_file(staged);
                    }
                    return Err(err);
                }
            }
        }

        for previous in replaced.into_iter().filter_map(|(_, previous)| previous) {
            let _ = fs::remove_file(previous);
        }
        log::debug!("Committed {} output files", entries.len());
        Ok(())
    }
}

impl Drop for StagedOutputs {
    fn drop(&mut self) {
        for (staged, _) in &self.entries {
            let _ = fs::remove_file(staged);
        }
    }
}

/// Move `staged` over `target`, setting any existing target aside as
/// `<name>.previous`. Returns where the old target went.
fn replace_target(staged: &Path, target: &Path) -> Result<Option<PathBuf>, String> {
    let previous = if target.exists() {
        let aside = sibling_path(target, "previous");
        fs::rename(target, &aside).map_err(|e| {
            format!("Failed to set aside existing '{}': {e}", target.display())
        })?;
        Some(aside)
    } else {
        None
    };
    if let Err(e) = fs::rename(staged, target) {
        if let Some(aside) = &previous {
            let _ = fs::rename(aside, target);
        }
        return Err(format!(
            "Failed to move '{}' into place at '{}': {e}",
            staged.display(),
            target.display()
        ));
    }
    Ok(previous)
}
