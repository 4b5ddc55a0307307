use crate::error::Result;

use super::Session;

pub fn run(session: &Session) -> Result<()> {
    let settings = &session.settings;
    println!("User:       {}", if session.user.is_empty() { "(not set)" } else { &session.user });
    println!("Data dir:   {}", settings.data_dir);
    println!("Settings:   {}", crate::settings::settings_path().display());
    println!();

    let mut missing = 0;
    for (name, source) in settings.sources.entries() {
        let path = settings.resolve(source);
        let state = if path.exists() {
            "present"
        } else {
            missing += 1;
            "missing"
        };
        println!("{name:<22} {state:<8} {}", path.display());
    }
    if missing > 0 {
        println!();
        println!("{missing} source(s) missing. Reports that need them will fail until the files are in place.");
    }
    Ok(())
}
