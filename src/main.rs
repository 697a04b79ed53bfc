fn main() -> Result<(), Box<dyn std::error::Error>> {
    agora::cli::main()
}
