use env_logger::Env;
use log::error;
use nlp_gateway::GatewayConfig;

#[tokio::main]
async fn main()
{   dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
      .init();

    let config = match GatewayConfig::from_env()
    {   Ok(config) => config
      , Err(e) => {
          error!("Startup failed: {}", e);
          std::process::exit(1);
        }
    };

    if let Err(e) = nlp_gateway::serve(config).await
    {   error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
