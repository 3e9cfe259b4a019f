fn main() -> anyhow::Result<()> {
    starship_snow::run()
}
