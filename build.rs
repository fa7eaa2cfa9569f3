use std::env;

fn main() {
    // `sqlx::migrate!` embeds the migrations at compile time
    println!("cargo:rerun-if-changed=migrations");

    println!("cargo:rerun-if-env-changed=DATABASE_URL");
    if env::var_os("DATABASE_URL").is_some() {
        println!("cargo:warning=DATABASE_URL is ignored at build time, queries are checked at runtime");
    }
}
