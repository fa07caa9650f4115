// Fetch the commit hash from git and expose the build version to the crate.

use std::process::Command;

fn main() {
    let commit_hash = if let Some(hash) = option_env!("ORBIT_COMMIT_HASH") {
        hash.chars().take(7).collect()
    } else {
        match Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
        {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            // Not a git checkout
            _ => "unknown".to_string(),
        }
    };

    let build_version = format!("{}-{}", env!("CARGO_PKG_VERSION"), commit_hash);
    println!("cargo:rerun-if-env-changed=ORBIT_COMMIT_HASH");
    println!("cargo:rustc-env=BUILD_VERSION={build_version}");
}
