// SPDX-License-Identifier: Apache-2.0

// build.rs for tiermath
use std::env;
use std::process::Command;

const DEFAULT_ARCH: u32 = 322;

fn parse_arch(raw: &str) -> Option<u32> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V', 'm', 'M']);
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

// Ask the device query tool for the installed unit's architecture, if present.
fn detect_device_arch() -> Option<u32> {
    let output = Command::new("tiermath-query")
        .args(["--query=arch", "--format=plain"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let arch_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if arch_str.is_empty() || arch_str == "N/A" {
        return None;
    }
    parse_arch(&arch_str)
}

fn main() {
    println!("cargo:rustc-check-cfg=cfg(tier_v300)");
    println!("cargo:rustc-check-cfg=cfg(tier_v322)");
    println!("cargo:rerun-if-env-changed=TIERMATH_ARCH");
    println!("cargo:rerun-if-changed=build.rs");

    let arch = match env::var("TIERMATH_ARCH") {
        Ok(raw) => parse_arch(&raw).unwrap_or_else(|| {
            println!(
                "cargo:warning=TIERMATH_ARCH={} is not an architecture number, using {}",
                raw, DEFAULT_ARCH
            );
            DEFAULT_ARCH
        }),
        Err(_) => detect_device_arch().unwrap_or(DEFAULT_ARCH),
    };

    // `disable-native` pins the fallback tier no matter what was detected
    let arch = if env::var_os("CARGO_FEATURE_DISABLE_NATIVE").is_some() {
        200
    } else {
        arch
    };

    if arch >= 300 {
        println!("cargo:rustc-cfg=tier_v300");
    }
    if arch >= 322 {
        println!("cargo:rustc-cfg=tier_v322");
    }
    println!("cargo:rustc-env=TIERMATH_BUILD_ARCH={}", arch);
}
