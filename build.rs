use std::env;
use std::fs;
use std::path::Path;

// Inyecta las variables de .env como rustc-env para que config.rs las
// pueda leer con option_env! (CACHE_VERSION, SYNC_ENDPOINT)
fn main() {
    let env_file = Path::new(".env");

    if env_file.exists() {
        println!("cargo:rerun-if-changed=.env");

        if let Ok(contents) = fs::read_to_string(env_file) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = line.split_once('=') {
                    // El entorno real tiene prioridad sobre .env
                    if env::var(key.trim()).is_err() {
                        println!("cargo:rustc-env={}={}", key.trim(), value.trim());
                    }
                }
            }
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}
