//! End-to-end pipeline tests against scripted stand-ins for the external
//! tools, wired in through the `[tools]` config table. The stand-ins mimic
//! the real tools' observable behavior — `OUT*.tif` side effects, honoring
//! `--output=`, streaming to stdout — so these tests exercise the production
//! `SystemTools` invocation path and the on-disk lifecycle for real.
#![cfg(unix)]

use macrostack::config::{RawTarget, ToolsConfig};
use macrostack::stack::{self, StackError, StackJob};
use macrostack::tools::SystemTools;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fabricates one `OUT<n>.tif` per input image and appends the image count
/// to `align.log`, like `align_image_stack -m -a OUT <images...>` would
/// (minus the geometry).
const FAKE_ALIGN: &str = r#"
shift 3
printf '%s\n' "$#" >> align.log
i=0
for src in "$@"; do
  printf 'aligned %s\n' "$src" > "$(printf 'OUT%04d.tif' "$i")"
  i=$((i+1))
done
"#;

/// Fails on its second invocation, with a diagnostic on stderr.
const FAKE_ALIGN_FAILS_SECOND: &str = r#"
if [ -f align_ran ]; then
  echo "correlation failed" >&2
  exit 1
fi
touch align_ran
shift 3
i=0
for src in "$@"; do
  printf 'aligned %s\n' "$src" > "$(printf 'OUT%04d.tif' "$i")"
  i=$((i+1))
done
"#;

/// Writes the file named by `--output=`, recording how many input files it
/// was handed.
const FAKE_FUSE: &str = r#"
out=""
inputs=0
for arg in "$@"; do
  case "$arg" in
    --output=*) out="${arg#--output=}" ;;
    -*) ;;
    *) inputs=$((inputs+1)) ;;
  esac
done
printf 'fused %s inputs\n' "$inputs" > "$out"
"#;

/// Streams fake developed bytes to stdout, like `dcraw -c`.
const FAKE_DEVELOP: &str = r#"
printf 'TIFFDATA %s' "$4"
"#;

/// Records its argv, like a well-behaved exiftool.
const FAKE_EXIF: &str = r#"
printf '%s\n' "$@" > exif.log
"#;

const FAKE_EXIF_FAILS: &str = r#"
echo "no writable tags" >&2
exit 1
"#;

struct Fixture {
    _tmp: TempDir,
    work: PathBuf,
    bin: PathBuf,
    tools: ToolsConfig,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        let work = tmp.path().join("work");
        fs::create_dir(&bin).unwrap();
        fs::create_dir(&work).unwrap();

        let tools = ToolsConfig {
            align: write_script(&bin, "fake-align", FAKE_ALIGN),
            fuse: write_script(&bin, "fake-enfuse", FAKE_FUSE),
            develop: write_script(&bin, "fake-dcraw", FAKE_DEVELOP),
            exif: write_script(&bin, "fake-exiftool", FAKE_EXIF),
        };
        Fixture {
            _tmp: tmp,
            work,
            bin,
            tools,
        }
    }

    fn seed(&self, count: usize, ext: &str) -> Vec<String> {
        let names: Vec<String> = (0..count).map(|i| format!("IMG_{i:04}.{ext}")).collect();
        for name in &names {
            fs::write(self.work.join(name), format!("pixels of {name}")).unwrap();
        }
        names
    }

    fn job(&self, extension: &str, batch_size: usize) -> StackJob {
        StackJob {
            dir: self.work.clone(),
            extension: extension.to_string(),
            subject: "Beetle".to_string(),
            batch_size,
            raw_formats: vec!["CR2".to_string(), "CR3".to_string(), "NEF".to_string()],
            raw_target: RawTarget::Tiff,
        }
    }

    fn align_log(&self) -> Vec<String> {
        fs::read_to_string(self.work.join("align.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn final_artifacts(&self) -> Vec<String> {
        list(&self.work)
            .into_iter()
            .filter(|n| n.contains("Stacked"))
            .collect()
    }
}

fn write_script(bin: &Path, name: &str, body: &str) -> String {
    let path = bin.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().into_owned()
}

fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn multi_batch_run_produces_final_image_and_cleans_up() {
    let fx = Fixture::new();
    let names = fx.seed(12, "jpg");
    let tools = SystemTools::new(&fx.tools);

    let outcome = stack::run(&tools, &fx.job("jpg", 5), None).unwrap();

    assert_eq!(outcome.input_count, 12);
    assert_eq!(
        outcome.batch_artifacts,
        vec!["stack_0.tif", "stack_1.tif", "stack_2.tif"]
    );
    assert!(outcome.final_image.starts_with("BeetleStacked12_"));
    assert!(fx.work.join(&outcome.final_image).exists());

    // Three batch alignments (5, 5, 2 images) then the artifact alignment.
    assert_eq!(fx.align_log(), vec!["5", "5", "2", "3"]);

    // Transient frames gone, artifacts retained, originals untouched.
    let remaining = list(&fx.work);
    assert!(remaining.iter().all(|n| !n.starts_with("OUT")));
    assert!(remaining.iter().any(|n| n == "stack_2.tif"));
    for name in &names {
        assert_eq!(
            fs::read(fx.work.join(name)).unwrap(),
            format!("pixels of {name}").into_bytes()
        );
    }

    // exiftool was pointed from the first input at the final image.
    let exif_log = fs::read_to_string(fx.work.join("exif.log")).unwrap();
    let argv: Vec<&str> = exif_log.lines().collect();
    assert_eq!(
        argv,
        vec![
            "-tagsFromFile",
            "IMG_0000.jpg",
            "-overwrite_original",
            outcome.final_image.as_str(),
        ]
    );
}

#[test]
fn single_batch_fuses_directly_without_final_alignment() {
    let fx = Fixture::new();
    fx.seed(4, "jpg");
    let tools = SystemTools::new(&fx.tools);

    let outcome = stack::run(&tools, &fx.job("jpg", 10), None).unwrap();

    assert_eq!(outcome.batch_artifacts, vec!["stack_0.tif"]);
    // Exactly one alignment: the batch's own.
    assert_eq!(fx.align_log(), vec!["4"]);
    assert!(fx.work.join(&outcome.final_image).exists());
    // The final fuse consumed the lone artifact itself.
    assert_eq!(
        fs::read_to_string(fx.work.join(&outcome.final_image)).unwrap(),
        "fused 1 inputs\n"
    );
}

#[test]
fn raw_inputs_are_developed_and_temporaries_removed() {
    let fx = Fixture::new();
    let names = fx.seed(3, "CR3");
    let tools = SystemTools::new(&fx.tools);

    let outcome = stack::run(&tools, &fx.job("CR3", 10), None).unwrap();

    assert!(outcome.final_image.starts_with("BeetleStacked3_"));
    assert_eq!(fx.align_log(), vec!["3"]);

    let remaining = list(&fx.work);
    assert!(remaining.iter().all(|n| !n.contains("_dev")));
    for name in &names {
        assert_eq!(
            fs::read(fx.work.join(name)).unwrap(),
            format!("pixels of {name}").into_bytes()
        );
    }
}

#[test]
fn alignment_failure_aborts_and_surfaces_tool_output() {
    let fx = Fixture::new();
    fx.seed(10, "jpg");
    let mut tools_config = fx.tools.clone();
    tools_config.align = write_script(&fx.bin, "fake-align-flaky", FAKE_ALIGN_FAILS_SECOND);
    let tools = SystemTools::new(&tools_config);

    let err = stack::run(&tools, &fx.job("jpg", 5), None).unwrap_err();

    // The failing tool's stderr reaches the user through the error.
    assert!(matches!(err, StackError::Tool(_)));
    assert!(err.to_string().contains("correlation failed"));

    // The first batch's artifact survives for diagnosis; no final image.
    assert!(fx.work.join("stack_0.tif").exists());
    assert!(!fx.work.join("stack_1.tif").exists());
    assert!(fx.final_artifacts().is_empty());
}

#[test]
fn metadata_failure_still_reports_success() {
    let fx = Fixture::new();
    fx.seed(3, "jpg");
    let mut tools_config = fx.tools.clone();
    tools_config.exif = write_script(&fx.bin, "fake-exiftool-broken", FAKE_EXIF_FAILS);
    let tools = SystemTools::new(&tools_config);

    let outcome = stack::run(&tools, &fx.job("jpg", 10), None).unwrap();

    assert!(!outcome.metadata_applied);
    assert!(fx.work.join(&outcome.final_image).exists());
}
