use sha2::{Digest, Sha256};

const KEYWORD_EMOJIS: &[(&str, [&str; 3])] = &[
    ("smile", ["😊", "😄", "😃"]),
    ("happy", ["😊", "😄", "🙂"]),
    ("sad", ["😢", "😭", "☹️"]),
    ("angry", ["😠", "😡", "😤"]),
    ("love", ["❤️", "😍", "🥰"]),
    ("laugh", ["😂", "🤣", "😆"]),
    ("cry", ["😢", "😭", "😿"]),
    ("surprised", ["😲", "😮", "😯"]),
    ("cool", ["😎", "🆒", "👍"]),
    ("wink", ["😉", "😜", "😋"]),
    ("thumbs", ["👍", "👎", "🤝"]),
    ("hand", ["🤚", "✋", "👋"]),
    ("peace", ["✌️", "☮️", "🕊️"]),
    ("ok", ["👌", "✅", "👍"]),
    ("clap", ["👏", "🙌", "💪"]),
    ("cat", ["🐱", "😸", "🙀"]),
    ("dog", ["🐶", "🐕", "🦮"]),
    ("heart", ["❤️", "💖", "💕"]),
    ("fire", ["🔥", "💥", "⚡"]),
    ("star", ["⭐", "🌟", "✨"]),
    ("work", ["💼", "👔", "💻"]),
    ("computer", ["💻", "🖥️", "⌨️"]),
    ("phone", ["📱", "☎️", "📞"]),
    ("food", ["🍕", "🍔", "🍟"]),
    ("coffee", ["☕", "🍵", "🥤"]),
    ("cake", ["🎂", "🧁", "🍰"]),
    ("football", ["⚽", "🏈", "🏆"]),
    ("music", ["🎵", "🎶", "🎧"]),
    ("party", ["🎉", "🥳", "🎊"]),
    ("brasil", ["🇧🇷", "💚", "💛"]),
    ("futebol", ["⚽", "🏆", "🇧🇷"]),
    ("carnaval", ["🎭", "🎉", "💃"]),
];

const GENERIC_EMOJIS: &[[&str; 3]] = &[
    ["😊", "🙂", "😄"],
    ["😎", "🤔", "😮"],
    ["👍", "✌️", "🤚"],
    ["❤️", "💖", "⭐"],
    ["🔥", "💥", "✨"],
];

/// Derives the emoji tag set for a sticker from its filename.
///
/// The first keyword contained in the lower-cased name wins. Names with no
/// known keyword get one of the generic sets, picked from a digest of the
/// name so the same file always maps to the same tags.
pub fn emoji_tags_for(filename: &str) -> Vec<String> {
    let lower = filename.to_lowercase();

    let set = KEYWORD_EMOJIS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, emojis)| emojis)
        .unwrap_or_else(|| {
            let digest = Sha256::digest(lower.as_bytes());
            &GENERIC_EMOJIS[digest[0] as usize % GENERIC_EMOJIS.len()]
        });

    set.iter().map(|e| e.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match() {
        assert_eq!(emoji_tags_for("Happy_Cat.webp"), vec!["😊", "😄", "🙂"]);
        assert_eq!(emoji_tags_for("fire-01.png"), vec!["🔥", "💥", "⚡"]);
    }

    #[test]
    fn test_fallback_is_deterministic_and_non_empty() {
        let a = emoji_tags_for("0001.webp");
        let b = emoji_tags_for("0001.webp");
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(GENERIC_EMOJIS
            .iter()
            .any(|set| set.iter().map(|e| e.to_string()).collect::<Vec<_>>() == a));
    }
}
