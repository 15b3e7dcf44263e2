//! Monitoring configuration: which sites to watch and which headline
//! keywords mark a link as worth analyzing.
//!
//! The configuration is immutable data built once in `main` and passed by
//! reference into the pipeline, so the monitored universe is explicit at the
//! call site rather than hidden in globals.

/// A news site to monitor: display name plus listing-page URL.
#[derive(Debug, Clone)]
pub struct Site {
    pub name: &'static str,
    pub base_url: &'static str,
}

/// The full monitoring universe for a run.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sites: Vec<Site>,
    pub keywords: Vec<&'static str>,
}

impl MonitorConfig {
    /// The Argentine outlets and protest vocabulary this deployment watches.
    pub fn argentina() -> Self {
        let sites = vec![
            Site { name: "Prensa Obrera", base_url: "https://prensaobrera.com/" },
            Site { name: "Mundo Gremial", base_url: "https://www.mundogremial.com/" },
            Site { name: "Infobae Política", base_url: "https://www.infobae.com/politica/" },
            Site { name: "Maria Press", base_url: "https://www.mariapress.com/" },
            Site { name: "La Izquierda Diario", base_url: "https://www.laizquierdadiario.com/" },
            Site { name: "Pagina12", base_url: "https://www.pagina12.com.ar/secciones/el-pais" },
            Site { name: "Iprofesional", base_url: "https://www.iprofesional.com/" },
            Site { name: "Anred", base_url: "https://www.anred.org/" },
            Site { name: "Redeco", base_url: "https://www.redeco.com.ar/" },
            Site { name: "El Ciudadano", base_url: "https://elciudadanoweb.com/" },
            Site { name: "11noticias", base_url: "https://11noticias.com/" },
            Site { name: "Conclusión", base_url: "https://www.conclusion.com.ar/" },
            Site { name: "INFONOROESTE", base_url: "https://infonoroeste.com.ar/" },
            Site { name: "INFOREGION", base_url: "https://www.inforegion.com.ar/" },
            Site { name: "ATE", base_url: "https://ate.org.ar/" },
            Site { name: "Data Gremial", base_url: "https://www.datagremial.com/" },
        ];

        let keywords = vec![
            "protesta",
            "movilización",
            "corte",
            "piquete",
            "acampe",
            "paro",
            "reclamo",
            "manifestación",
            "gremial",
            "sindical",
            "marcha",
            "concentración",
            "asamblea",
            "repudio",
            "huelga",
        ];

        MonitorConfig { sites, keywords }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argentina_config_is_populated() {
        let config = MonitorConfig::argentina();
        assert_eq!(config.sites.len(), 16);
        assert_eq!(config.keywords.len(), 15);
        assert!(config.sites.iter().all(|s| s.base_url.starts_with("https://")));
    }

    #[test]
    fn test_keywords_are_lowercase() {
        // Link titles are lowercased before matching, so the keyword list
        // must already be lowercase for the substring check to ever hit.
        let config = MonitorConfig::argentina();
        for kw in &config.keywords {
            assert_eq!(*kw, kw.to_lowercase());
        }
    }
}
