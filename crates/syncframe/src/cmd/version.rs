use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("syncframe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: syncframe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("SYNCFRAME_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: fixture={}, async={}, cli=true",
        cfg!(feature = "fixture"),
        cfg!(feature = "async")
    );
    println!(
        "frame: marker=0x{:02x}{:02x}, max_items={}, max_frame_len={}",
        syncframe_frame::MARKER[0],
        syncframe_frame::MARKER[1],
        syncframe_frame::MAX_ITEMS,
        syncframe_frame::MAX_FRAME_LEN
    );

    Ok(SUCCESS)
}
