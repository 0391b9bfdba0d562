//! User-agent classification stored with each verification event.

/// Device details derived from a User-Agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub os: Os,
    pub browser: Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Macos,
    Ios,
    Android,
    Linux,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Edge,
    Opera,
    Chrome,
    Firefox,
    Safari,
    Other,
}

impl DeviceInfo {
    /// JSON form stored alongside a verification event.
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

/// Parse device type, OS and browser from a User-Agent header.
pub fn detect(user_agent: &str) -> DeviceInfo {
    let ua = user_agent.to_ascii_lowercase();

    // Order matters: iOS and Android UAs also mention "mac os x" / "linux".
    let os = if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        Os::Ios
    } else if ua.contains("android") {
        Os::Android
    } else if ua.contains("windows") || ua.contains("win64") || ua.contains("win32") {
        Os::Windows
    } else if ua.contains("mac os") || ua.contains("macintosh") || ua.contains("darwin") {
        Os::Macos
    } else if ua.contains("linux") || ua.contains("x11") {
        Os::Linux
    } else {
        Os::Unknown
    };

    let device_type = if ua.contains("bot") || ua.contains("crawler") || ua.contains("spider") {
        DeviceType::Bot
    } else if ua.contains("ipad") || ua.contains("tablet") {
        DeviceType::Tablet
    } else if ua.contains("android") && !ua.contains("mobile") {
        // Android tablets omit the "Mobile" token.
        DeviceType::Tablet
    } else if ua.contains("mobile") || ua.contains("iphone") || ua.contains("ipod") {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    };

    // Edge and Opera both carry "chrome"; Chrome carries "safari".
    let browser = if ua.contains("edg/") || ua.contains("edge/") {
        Browser::Edge
    } else if ua.contains("opr/") || ua.contains("opera") {
        Browser::Opera
    } else if ua.contains("chrome/") || ua.contains("crios/") {
        Browser::Chrome
    } else if ua.contains("firefox/") || ua.contains("fxios/") {
        Browser::Firefox
    } else if ua.contains("safari/") {
        Browser::Safari
    } else {
        Browser::Other
    };

    DeviceInfo {
        device_type,
        os,
        browser,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn chrome_on_windows() {
        let d = detect(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        );
        assert_eq!(d.os, Os::Windows);
        assert_eq!(d.browser, Browser::Chrome);
        assert_eq!(d.device_type, DeviceType::Desktop);
    }

    #[test]
    fn safari_on_iphone() {
        let d = detect(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
        );
        assert_eq!(d.os, Os::Ios);
        assert_eq!(d.browser, Browser::Safari);
        assert_eq!(d.device_type, DeviceType::Mobile);
    }

    #[test]
    fn android_tablet_without_mobile_token() {
        let d = detect(
            "Mozilla/5.0 (Linux; Android 14; SM-X710) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        );
        assert_eq!(d.os, Os::Android);
        assert_eq!(d.device_type, DeviceType::Tablet);
    }

    #[test]
    fn edge_is_not_reported_as_chrome() {
        let d = detect(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36 Edg/124.0",
        );
        assert_eq!(d.browser, Browser::Edge);
    }

    #[test]
    fn firefox_on_linux() {
        let d = detect("Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0");
        assert_eq!(d.os, Os::Linux);
        assert_eq!(d.browser, Browser::Firefox);
    }

    #[test]
    fn crawler_is_a_bot() {
        let d = detect("Googlebot/2.1 (+http://www.google.com/bot.html)");
        assert_eq!(d.device_type, DeviceType::Bot);
        assert_eq!(d.os, Os::Unknown);
    }

    #[test]
    fn curl_is_unknown_desktop() {
        let d = detect("curl/8.5.0");
        assert_eq!(d.os, Os::Unknown);
        assert_eq!(d.browser, Browser::Other);
        assert_eq!(d.device_type, DeviceType::Desktop);
    }

    #[test]
    fn json_form_uses_lowercase_names() {
        let json = detect("curl/8.5.0").to_json().unwrap();
        assert_eq!(
            json,
            r#"{"device_type":"desktop","os":"unknown","browser":"other"}"#
        );
    }
}
