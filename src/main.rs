fn main() {
    basalt::run_cli();
}
