pub struct Athena {}

static ATHENA_STATIC: std::sync::OnceLock<AthenaStatic> = std::sync::OnceLock::new();

struct AthenaStatic {}

impl AthenaStatic {
    fn init(app_name: &str) -> &'static Self {
        athena_profiling::profile_function!();

        ATHENA_STATIC.get_or_init(|| {
            env_logger::builder()
                .filter_level(log::LevelFilter::Info)
                .filter_module("gltf", log::LevelFilter::Warn)
                .parse_default_env()
                .init();

            log::debug!("Initialized {}", app_name);
            Self {}
        })
    }
}

impl Athena {
    pub fn new(app_name: &str) -> Self {
        AthenaStatic::init(app_name);

        Self {}
    }
}
