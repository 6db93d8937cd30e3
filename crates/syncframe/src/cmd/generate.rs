use std::fs::File;
use std::io::Write;

use syncframe::fixture::generate;

use crate::cmd::{is_stdio, GenerateArgs};
use crate::exit::{io_error, CliResult, SUCCESS};

pub fn run(args: GenerateArgs) -> CliResult<i32> {
    let fixture = generate(&args.stream.spec());

    let mut body = fixture.stream.to_vec();
    if args.hex {
        body = hex::encode(&body).into_bytes();
        body.push(b'\n');
    }

    if is_stdio(args.output.as_ref()) {
        let mut out = std::io::stdout().lock();
        out.write_all(&body)
            .and_then(|()| out.flush())
            .map_err(|err| io_error("failed writing stdout", err))?;
    } else if let Some(path) = args.output.as_ref() {
        let mut file = File::create(path)
            .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
        file.write_all(&body)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
    }

    tracing::info!(
        frames = fixture.payloads.len(),
        corrupted = fixture.corrupted.len(),
        bytes = fixture.stream.len(),
        seed = ?args.stream.seed,
        "generated stream"
    );

    Ok(SUCCESS)
}
