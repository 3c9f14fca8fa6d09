/// SketchCAD Terminal - sketch, extrude and inspect solids in a terminal
///
/// Usage: sketchcad-terminal [FILE] [--depth N] [--export OUT] [--ascii]
///
///   FILE          an .stl to view or a sketch .json to extrude
///   --depth N     extrusion depth for sketches (default 20)
///   --export OUT  convert FILE to STL at OUT without opening the UI
///   --ascii       write ASCII STL instead of binary
///
/// Without FILE the app starts in sketch mode. Tab switches between the
/// sketcher and the viewer, Q quits.

use sketchcad_core::{config::DEFAULT_EXTRUDE_DEPTH, BufferBackend, Camera, Workbench};
use sketchcad_terminal::TerminalApp;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: sketchcad-terminal [FILE] [--depth N] [--export OUT] [--ascii]";

#[derive(Debug)]
struct Args {
    file: Option<PathBuf>,
    depth: f32,
    export: Option<PathBuf>,
    ascii: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        file: None,
        depth: DEFAULT_EXTRUDE_DEPTH,
        export: None,
        ascii: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--depth" => {
                let value = args.next().ok_or("--depth needs a value")?;
                parsed.depth = value
                    .parse()
                    .map_err(|_| format!("invalid depth: {value}"))?;
            }
            "--export" => {
                let value = args.next().ok_or("--export needs a path")?;
                parsed.export = Some(PathBuf::from(value));
            }
            "--ascii" => parsed.ascii = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            _ if parsed.file.is_none() => parsed.file = Some(PathBuf::from(&arg)),
            _ => return Err(format!("unexpected argument {arg}")),
        }
    }
    Ok(parsed)
}

fn init_logging(default: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn invalid_data(e: sketchcad_core::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Convert FILE to STL without a terminal UI.
fn convert(input: &Path, output: &Path, depth: f32, ascii: bool) -> io::Result<()> {
    let bytes = fs::read(input)?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut workbench = Workbench::new(BufferBackend::new(), Camera::default());
    workbench
        .open_file(&name, &bytes, depth)
        .map_err(invalid_data)?;

    let stl = if ascii {
        workbench.export_stl_ascii().map(String::into_bytes)
    } else {
        workbench.export_stl()
    }
    .map_err(invalid_data)?;
    fs::write(output, &stl)?;

    let triangles = workbench
        .viewport()
        .active_mesh()
        .map_or(0, |mesh| mesh.len());
    println!("Wrote {} ({triangles} triangles)", output.display());
    Ok(())
}

fn main() -> io::Result<()> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    if let Some(output) = &args.export {
        init_logging("warn");
        let Some(input) = &args.file else {
            eprintln!("--export needs an input FILE\n{USAGE}");
            std::process::exit(2);
        };
        return convert(input, output, args.depth, args.ascii);
    }

    // Log lines would scribble over the alternate screen; opt in with RUST_LOG.
    init_logging("off");

    let mut app = TerminalApp::new(args.depth)?;
    app.set_ascii_export(args.ascii);
    if let Some(file) = &args.file {
        app.open(file)?;
    }
    app.run()
}
