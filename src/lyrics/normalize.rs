//! Video-title cleanup for lyrics search.
//!
//! Bilibili uploads decorate song names with bracketed annotations and
//! quality tags ("【4K】周杰伦 晴天 (官方MV) Hi-Res"); QQ Music search wants
//! the bare song name.

use once_cell::sync::Lazy;
use regex::Regex;

static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"【.*?】|\[.*?\]|《.*?》|\(.*?\)|（.*?）|Hi-Res|Hi-res|hi-res|HD|4K|\d+K|\s+")
        .unwrap()
});

static PLATFORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"在.*?试听|在.*?听|在.*?播放|在.*?唱").unwrap());

/// Strip annotations, quality tags and platform phrases. A title that
/// cleans down to nothing falls back to the original verbatim.
pub fn clean_title(title: &str) -> String {
    let cleaned = NOISE_RE.replace_all(title, " ");
    let cleaned = PLATFORM_RE.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        title.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_brackets_and_quality_tags() {
        assert_eq!(clean_title("歌曲名【Live】(Hi-Res)"), "歌曲名");
        assert_eq!(clean_title("【4K】晴天 周杰伦（官方版）"), "晴天 周杰伦");
        assert_eq!(clean_title("Song Title [MV] HD"), "Song Title");
        assert_eq!(clean_title("夜曲《十一月的萧邦》8K"), "夜曲");
    }

    #[test]
    fn strips_platform_phrases() {
        assert_eq!(clean_title("在B站试听 晴天"), "晴天");
        assert_eq!(clean_title("在网易云播放 富士山下"), "富士山下");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(clean_title("晴天   周杰伦\t钢琴版"), "晴天 周杰伦 钢琴版");
    }

    #[test]
    fn empty_result_falls_back_to_original() {
        assert_eq!(clean_title("【】"), "【】");
        assert_eq!(clean_title("4K Hi-Res"), "4K Hi-Res");
    }

    #[test]
    fn plain_titles_pass_through() {
        assert_eq!(clean_title("晴天"), "晴天");
    }
}
