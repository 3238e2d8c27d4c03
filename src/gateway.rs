use url::Url;

/// アップロード済みコンテンツ ID から取得用 URL を組み立てる
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    base: String,
    image_mutable: bool,
    metadata_mutable: bool,
}

impl Gateway {
    pub fn new(base: &Url, image_mutable: bool, metadata_mutable: bool) -> Self {
        let base = base.as_str();
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        Gateway {
            base,
            image_mutable,
            metadata_mutable,
        }
    }

    pub fn image_url(&self, id: &str) -> String {
        self.url(self.image_mutable, id)
    }

    pub fn metadata_url(&self, id: &str) -> String {
        self.url(self.metadata_mutable, id)
    }

    fn url(&self, mutable: bool, id: &str) -> String {
        if mutable {
            format!("{}mutable/{}", self.base, id)
        } else {
            format!("{}{}", self.base, id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str, image_mutable: bool, metadata_mutable: bool) -> Gateway {
        Gateway::new(&Url::parse(base).unwrap(), image_mutable, metadata_mutable)
    }

    #[test]
    fn mutable_image_url() {
        let gateway = gateway("https://gateway.irys.xyz", true, false);

        assert_eq!(gateway.image_url("abc123"), "https://gateway.irys.xyz/mutable/abc123");
        assert_eq!(gateway.metadata_url("def456"), "https://gateway.irys.xyz/def456");
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        let gateway = gateway("https://gateway.irys.xyz/", false, true);

        assert_eq!(gateway.image_url("abc"), "https://gateway.irys.xyz/abc");
        assert_eq!(gateway.metadata_url("abc"), "https://gateway.irys.xyz/mutable/abc");
    }

    #[test]
    fn base_path_is_kept() {
        let gateway = gateway("https://example.com/irys", false, false);

        assert_eq!(gateway.image_url("abc"), "https://example.com/irys/abc");
    }
}
