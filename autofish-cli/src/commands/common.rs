use autofish::config::PatchConfig;

use crate::app::GlobalOptions;

/// The configuration named by the global options: `--dir`, else `TERRARIA_DIR`, else the
/// Steam install location.
pub fn config(opts: &GlobalOptions) -> PatchConfig {
    let config = match &opts.dir {
        Some(dir) => PatchConfig::new().with_game_dir(dir),
        None => PatchConfig::from_env(),
    };
    config.with_exe_name(opts.exe.as_str())
}
