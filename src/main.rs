//! Camtrap CLI entry point.

fn main() {
    // Failures are already logged by `run`.
    if camtrap::run().is_err() {
        std::process::exit(1);
    }
}
