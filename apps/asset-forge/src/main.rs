fn main() -> anyhow::Result<()> {
    asset_forge::internal_main()
}
