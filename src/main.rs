use clap::{Parser, Subcommand};
use macrostack::{config, output, scan, stack, tools};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "macrostack")]
#[command(about = "Focus stacking for directories of macro photographs")]
#[command(long_about = "\
Focus stacking for directories of macro photographs

Point macrostack at a directory of focus-bracketed captures and it aligns
and fuses them into one image with extended depth of field, using Hugin's
align_image_stack and enfuse. Large sessions are processed in batches of 10
to keep memory bounded, then the batch results are aligned and fused into
the final image.

Workflow:

  $ cd ~/photos/moth-session
  $ macrostack scan                 # see what file types are present
  $ macrostack stack                # prompts for file type and subject
  ...
  MothStacked137_20260805_101500.tif

File names must sort in capture order (cameras number frames sequentially,
so they do). RAW files (CR2/CR3/NEF by default) are developed with dcraw
first; the originals are never modified. Metadata from the first frame is
copied into the final image with exiftool.

Requires align_image_stack, enfuse, dcraw, and exiftool on PATH (or
configured in macrostack.toml — run 'macrostack gen-config').")]
#[command(version)]
struct Cli {
    /// Directory containing the images to stack
    #[arg(long, default_value = ".", global = true)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the file types present in the directory
    Scan,
    /// Align and fuse one file type's images into a single image
    Stack(StackArgs),
    /// Print a stock macrostack.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct StackArgs {
    /// File extension to stack (prompted for when omitted)
    #[arg(long)]
    ext: Option<String>,

    /// Subject token used in the final file name (prompted for when omitted)
    #[arg(long)]
    subject: Option<String>,

    /// Images per batch (overrides macrostack.toml)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Open the final image with the system viewer when done
    #[arg(long)]
    show: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan => {
            let counts = scan::census(&cli.dir)?;
            output::print_census(&counts);
        }
        Command::Stack(args) => run_stack(&cli.dir, args)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_stack(dir: &Path, args: StackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(dir)?;
    let counts = scan::census(dir)?;

    // Resolve every interactive choice here; the orchestrator never prompts.
    let extension = match args.ext {
        Some(ext) => ext,
        None => {
            output::print_census(&counts);
            prompt_extension(&counts)?
        }
    };
    let subject = match args.subject {
        Some(subject) => subject,
        None => prompt_subject()?,
    };

    let job = stack::StackJob {
        dir: dir.to_path_buf(),
        extension,
        subject,
        batch_size: args.batch_size.unwrap_or(config.stacking.batch_size),
        raw_formats: config.stacking.raw_formats.clone(),
        raw_target: config.stacking.raw_target,
    };
    let tools = tools::SystemTools::new(&config.tools);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_stack_event(&event) {
                println!("{line}");
            }
        }
    });
    let result = stack::run(&tools, &job, Some(tx));
    printer.join().unwrap();

    let outcome = result?;
    output::print_summary(&outcome);

    if args.show {
        show_image(&job.dir.join(&outcome.final_image));
    }
    Ok(())
}

/// Ask for a file type until the answer is one the census actually contains.
fn prompt_extension(counts: &BTreeMap<String, usize>) -> io::Result<String> {
    loop {
        let choice = prompt("Select a file type to stack: ")?;
        if counts.contains_key(&choice) {
            return Ok(choice);
        }
        println!("Invalid selection: {choice}");
    }
}

fn prompt_subject() -> io::Result<String> {
    loop {
        let subject = prompt("Subject name for the final file (one word): ")?;
        if !subject.is_empty() {
            return Ok(subject);
        }
    }
}

fn prompt(question: &str) -> io::Result<String> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stdin closed during prompt",
        ));
    }
    Ok(line.trim().to_string())
}

/// Hand the final image to the platform viewer as a detached child.
fn show_image(path: &Path) {
    #[cfg(target_os = "macos")]
    let mut cmd = {
        let mut cmd = std::process::Command::new("open");
        cmd.arg(path);
        cmd
    };
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut cmd = std::process::Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut cmd = {
        let mut cmd = std::process::Command::new("xdg-open");
        cmd.arg(path);
        cmd
    };
    if let Err(err) = cmd.spawn() {
        log::warn!("could not open a viewer for {}: {err}", path.display());
    }
}
