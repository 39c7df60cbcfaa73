use std::process::Command;

fn main() {
    // Capture git commit hash at compile time
    let git_hash = run_capture("git", &["rev-parse", "--short", "HEAD"]);
    println!("cargo:rustc-env=FORENSIGHT_GIT_HASH={}", git_hash);

    let build_date = run_capture("date", &["+%Y-%m-%d"]);
    println!("cargo:rustc-env=FORENSIGHT_BUILD_DATE={}", build_date);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}

/// Run a command and return its trimmed stdout, or "unknown" on any failure.
fn run_capture(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
