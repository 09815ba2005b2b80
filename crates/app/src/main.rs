//! Entry point for bakeview.
//! CLI flags -> ViewerConfig, logging, run.

use std::path::PathBuf;

use anyhow::Result;
use platform::ViewerConfig;

/// Value of the first `--name=value` argument.
fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("--{name}=");
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let Some(val) = flag_value(args, "gpu-backend") else {
        return wgpu::Backends::all();
    };
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_size_args(args: &[String], default: (u32, u32)) -> (u32, u32) {
    let (mut w, mut h) = default;

    if let Some(v) = flag_value(args, "size") {
        if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
            if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                w = pw;
                h = ph;
            }
        }
    }
    if let Some(pw) = flag_value(args, "width").and_then(|v| v.parse().ok()) {
        w = pw;
    }
    if let Some(ph) = flag_value(args, "height").and_then(|v| v.parse().ok()) {
        h = ph;
    }
    (w.max(1), h.max(1))
}

fn parse_frames_arg(args: &[String]) -> Option<u64> {
    let val = flag_value(args, "frames")?;
    match val.parse::<u64>() {
        Ok(0) | Err(_) => {
            log::warn!("Ignoring --frames={}; running until closed.", val);
            None
        }
        Ok(n) => Some(n),
    }
}

fn parse_config(args: &[String]) -> ViewerConfig {
    let mut config = ViewerConfig::default();

    if let Some(v) = flag_value(args, "assets") {
        config.asset_root = PathBuf::from(v);
    }
    if let Some(v) = flag_value(args, "mesh") {
        config.mesh = v.to_owned();
    }
    if let Some(v) = flag_value(args, "texture") {
        config.texture = v.to_owned();
    }
    if let Some(v) = flag_value(args, "decoder-path") {
        config.decoder_path = PathBuf::from(v);
    }
    (config.width, config.height) = parse_size_args(args, (config.width, config.height));
    config.backends = parse_backend_arg(args);
    config.max_frames = parse_frames_arg(args);
    config
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = parse_config(&args);
    log::info!(
        "Starting bakeview. Backend: {:?}, window_size={}x{}, mesh={}, texture={}, assets={}",
        config.backends,
        config.width,
        config.height,
        config.mesh,
        config.texture,
        config.asset_root.display()
    );

    platform::run_viewer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse_config(&[]);
        assert_eq!(config.mesh, "spaceship.glb");
        assert_eq!(config.texture, "baked_2.jpg");
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.backends, wgpu::Backends::all());
        assert_eq!(config.max_frames, None);
    }

    #[test]
    fn asset_flags_override_defaults() {
        let config = parse_config(&args(&[
            "--assets=static",
            "--mesh=ship.glb",
            "--texture=hull.png",
            "--decoder-path=decoders/",
            "--gpu-backend=vulkan",
            "--frames=120",
        ]));
        assert_eq!(config.asset_root, PathBuf::from("static"));
        assert_eq!(config.mesh, "ship.glb");
        assert_eq!(config.texture, "hull.png");
        assert_eq!(config.decoder_path, PathBuf::from("decoders/"));
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert_eq!(config.max_frames, Some(120));
    }

    #[test]
    fn size_flags() {
        assert_eq!(parse_size_args(&args(&["--size=800x600"]), (1, 1)), (800, 600));
        assert_eq!(
            parse_size_args(&args(&["--size=800X600", "--height=300"]), (1, 1)),
            (800, 300)
        );
        assert_eq!(parse_size_args(&args(&["--width=0"]), (1280, 720)), (1, 720));
        assert_eq!(parse_size_args(&args(&["--size=bad"]), (1280, 720)), (1280, 720));
    }

    #[test]
    fn invalid_frame_budget_is_ignored() {
        assert_eq!(parse_frames_arg(&args(&["--frames=0"])), None);
        assert_eq!(parse_frames_arg(&args(&["--frames=abc"])), None);
    }
}
