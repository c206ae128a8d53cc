use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use retroboy_gb::{CoreConfig, GameBoy, JoypadState, SCREEN_HEIGHT, SCREEN_WIDTH};

pub const USAGE: &str = "Usage: retroboy <rom.gb> [--frames N] [--dump out.rgb] \
[--save-state out.state] [--load-state in.state] [--battery game.sav] [--colorize]";

/// Command line options of the headless runner.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub rom: PathBuf,
    pub frames: u32,
    /// Write the last frame as raw rgb24 here.
    pub dump: Option<PathBuf>,
    pub save_state: Option<PathBuf>,
    pub load_state: Option<PathBuf>,
    /// Battery RAM file, read before the run (if present) and written after.
    pub battery: Option<PathBuf>,
    pub colorize: bool,
}

impl Options {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        let mut rom = None;
        let mut options = Options {
            rom: PathBuf::new(),
            frames: 60,
            dump: None,
            save_state: None,
            load_state: None,
            battery: None,
            colorize: false,
        };

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .with_context(|| format!("{flag} expects a value"))
            };
            match arg.as_str() {
                "--frames" => {
                    let raw = value("--frames")?;
                    options.frames = raw
                        .parse()
                        .with_context(|| format!("invalid frame count '{raw}'"))?;
                }
                "--dump" => options.dump = Some(value("--dump")?.into()),
                "--save-state" => options.save_state = Some(value("--save-state")?.into()),
                "--load-state" => options.load_state = Some(value("--load-state")?.into()),
                "--battery" => options.battery = Some(value("--battery")?.into()),
                "--colorize" => options.colorize = true,
                flag if flag.starts_with("--") => bail!("unknown option '{flag}'"),
                path => {
                    if rom.replace(PathBuf::from(path)).is_some() {
                        bail!("more than one ROM path given");
                    }
                }
            }
        }

        options.rom = rom.context("no ROM path given")?;
        Ok(options)
    }
}

pub fn run(options: &Options) -> Result<()> {
    let rom = std::fs::read(&options.rom)
        .with_context(|| format!("failed to read ROM '{}'", options.rom.display()))?;
    let config = CoreConfig::builder().colorize(options.colorize).build();
    let mut gb = GameBoy::with_config(&rom, config)
        .with_context(|| format!("'{}' is not a usable ROM", options.rom.display()))?;
    log::info!("Playing '{}'", gb.title());

    if let Some(path) = &options.battery {
        if path.exists() {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read battery RAM '{}'", path.display()))?;
            gb.load_battery_ram(&data)
                .with_context(|| format!("battery RAM '{}' does not fit", path.display()))?;
        }
    }

    if let Some(path) = &options.load_state {
        let state = std::fs::read(path)
            .with_context(|| format!("failed to read state '{}'", path.display()))?;
        gb.load_state(&state)
            .with_context(|| format!("failed to load state '{}'", path.display()))?;
    }

    let mut samples = 0usize;
    for _ in 0..options.frames {
        samples += gb.run_frame(JoypadState::empty()).audio.len();
    }
    log::info!(
        "ran {} frames, {} audio samples, PC=0x{:04X}",
        options.frames,
        samples,
        gb.cpu().regs.pc
    );

    let serial = gb.serial_output();
    if !serial.is_empty() {
        println!("{}", String::from_utf8_lossy(serial));
    }

    if let Some(path) = &options.dump {
        let buffer = rgb24(gb.frame_buffer());
        std::fs::write(path, &buffer)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        println!(
            "Wrote {} bytes ({}x{} rgb24) after {} frames to '{}'",
            buffer.len(),
            SCREEN_WIDTH,
            SCREEN_HEIGHT,
            options.frames,
            path.display()
        );
    }

    if let Some(path) = &options.save_state {
        std::fs::write(path, gb.save_state())
            .with_context(|| format!("failed to write state '{}'", path.display()))?;
    }

    if let (Some(path), Some(ram)) = (&options.battery, gb.battery_ram()) {
        std::fs::write(path, ram)
            .with_context(|| format!("failed to write battery RAM '{}'", path.display()))?;
    }

    Ok(())
}

/// Unpack `0x00RRGGBB` pixels into packed rgb24 bytes.
pub fn rgb24(pixels: &[u32]) -> Vec<u8> {
    pixels
        .iter()
        .flat_map(|&p| [(p >> 16) as u8, (p >> 8) as u8, p as u8])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_all_flags() {
        let options = Options::parse(args(&[
            "game.gb",
            "--frames",
            "10",
            "--dump",
            "out.rgb",
            "--battery",
            "game.sav",
            "--colorize",
        ]))
        .unwrap();
        assert_eq!(options.rom, PathBuf::from("game.gb"));
        assert_eq!(options.frames, 10);
        assert_eq!(options.dump, Some(PathBuf::from("out.rgb")));
        assert_eq!(options.battery, Some(PathBuf::from("game.sav")));
        assert!(options.colorize);
        assert_eq!(options.load_state, None);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Options::parse(args(&[])).is_err());
        assert!(Options::parse(args(&["a.gb", "b.gb"])).is_err());
        assert!(Options::parse(args(&["a.gb", "--frames"])).is_err());
        assert!(Options::parse(args(&["a.gb", "--frames", "x"])).is_err());
        assert!(Options::parse(args(&["a.gb", "--turbo"])).is_err());
    }

    #[test]
    fn rgb24_unpacks_channels() {
        assert_eq!(rgb24(&[0x0012_3456, 0x00FF_0000]), vec![0x12, 0x34, 0x56, 0xFF, 0x00, 0x00]);
    }
}
