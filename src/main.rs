use braid::ui::output;

fn main() {
    if let Err(err) = braid::cli::run() {
        output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}
