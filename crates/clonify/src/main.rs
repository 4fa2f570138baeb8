fn main() -> anyhow::Result<()> {
    clonify::cli::main()
}
