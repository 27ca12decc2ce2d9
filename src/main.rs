fn main() -> std::process::ExitCode {
    read_to_me_lib::run()
}
