//! 提及解析
//!
//! 消息内容中任何 `@` 后跟一个或多个单词/空格字符的子串都是候选提及。
//! 由于展示名可以包含空格，候选段按空格边界展开为前缀序列
//! （`@Bob check this` 产生 "Bob"、"Bob check"、"Bob check this"），
//! 再由调用方逐一与用户目录做精确匹配；没有命中的候选被静默丢弃。

/// 单词字符：字母、数字或下划线
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// 提取消息内容中的候选提及名
///
/// 返回去重后的候选名列表，顺序为内容中首次出现的顺序。
pub fn extract_mention_candidates(content: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut chars = content.char_indices();

    while let Some((idx, c)) = chars.next() {
        if c != '@' {
            continue;
        }

        // 收集 @ 之后的连续单词/空格段
        let rest = &content[idx + c.len_utf8()..];
        let run: String = rest
            .chars()
            .take_while(|&c| is_word_char(c) || c == ' ')
            .collect();

        // 跳过已经消费的字符，避免把段内的 @ 重复处理
        for _ in 0..run.chars().count() {
            chars.next();
        }

        let words: Vec<&str> = run.split_whitespace().collect();
        let mut prefix = String::new();
        for word in words {
            if !prefix.is_empty() {
                prefix.push(' ');
            }
            prefix.push_str(word);
            if !candidates.iter().any(|c| c == &prefix) {
                candidates.push(prefix.clone());
            }
        }
    }

    candidates
}
