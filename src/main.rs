fn main() {
    if let Err(err) = zssn::runner::run_with_args() {
        eprintln!("zssn: {err}");
        std::process::exit(1);
    }
}
