fn run() -> Result<i32, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    pls::app::run_cli(args)
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
