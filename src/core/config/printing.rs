use std::path::Path;

use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self, config_path: &Path, personas_path: &Path) {
        println!("Current configuration ({}):", path_display(config_path));
        println!("  personas: {}", path_display(personas_path));
        match self.history_limit {
            limit if limit < 0 => println!("  history-limit: unlimited"),
            limit => println!("  history-limit: {limit}"),
        }
        println!("  server: {}", self.server.bind);
        println!(
            "  defaults: max_tokens={} temperature={} top_p={} mode={}",
            self.defaults.max_tokens,
            self.defaults.temperature,
            self.defaults.top_p,
            if self.defaults.use_local_model {
                "local"
            } else {
                "api"
            }
        );

        if self.local_model.enabled {
            println!(
                "  local-model: {} at {}",
                self.local_model.model, self.local_model.base_url
            );
        } else {
            println!("  local-model: (disabled)");
        }
        match self.local_model.load_timeout_secs {
            Some(secs) => println!("  load-timeout: {secs}s"),
            None => println!("  load-timeout: (none)"),
        }
        println!(
            "  api-model: {} at {}",
            self.api_model.model, self.api_model.base_url
        );
    }
}
