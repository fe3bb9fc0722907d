use std::fs;
use std::process::{Command, Output};

use pageconfig::PageConfig;
use tempfile::TempDir;

fn boltpage(config_dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_boltpage"))
        .env("BOLTPAGE_CONFIG_DIR", config_dir)
        .env_remove("BOLTPAGE_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run boltpage")
}

#[test]
fn config_where_uses_env_directory() {
    let root = TempDir::new().unwrap();
    let output = boltpage(root.path(), &["config", "where"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&root.path().display().to_string()), "{stdout}");
    assert!(stdout.contains("built-in defaults"), "{stdout}");
}

#[test]
fn config_show_merges_file_and_flags() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("page.toml"),
        "version = 1\n[lightning]\nhue = 15\nspeed = 2\n[morph]\ntexts = [\"HELLO\"]\n",
    )
    .unwrap();

    let output = boltpage(root.path(), &["--hue", "42", "config", "show"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let shown = PageConfig::from_toml_str(&stdout).expect("config show emits valid TOML");
    assert_eq!(shown.lightning.hue, 42.0);
    assert_eq!(shown.lightning.speed, 2.0);
    assert_eq!(shown.morph.texts, vec!["HELLO"]);
}

#[test]
fn invalid_config_fails_cleanly() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("page.toml"), "version = 2\n").unwrap();

    let output = boltpage(root.path(), &["config", "show"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported config version"), "{stderr}");
}

#[test]
fn still_export_writes_png() {
    let root = TempDir::new().unwrap();
    let out = root.path().join("frames/hero.png");
    let out_arg = out.display().to_string();

    let output = boltpage(
        root.path(),
        &[
            "still", "--out", &out_arg, "--no-text", "--width", "64", "--height", "32", "--time",
            "0.5",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let image = image::open(&out).expect("decode exported png").to_rgba8();
    assert_eq!(image.dimensions(), (64, 32));
    assert!(image.pixels().any(|pixel| pixel.0[..3] != [0, 0, 0]));
}
