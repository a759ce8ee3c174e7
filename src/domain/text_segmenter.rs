//! 文本分割器
//!
//! 把任意长度的文本切成适合单次 TTS 调用的片段：
//! 先按句末标点切成句子，再贪心地把句子拼进片段，直到超出字符预算。
//! 从不在句子中间截断，单句超长时单独成段。

use super::narration::Segment;

/// 默认单片段最大字符数
pub const DEFAULT_MAX_CHARS: usize = 400;

/// 句子之间插入的连接符
const JOINER: char = ' ';

/// 文本分割配置
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// 单片段最大字符数（含句间空格）
    pub max_chars: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// 句末标点（总是结束一个句子）
#[inline]
fn is_sentence_delimiter(ch: char) -> bool {
    matches!(ch, '.' | '?' | '!' | '…' | '。' | '？' | '！')
}

/// 紧跟在句末标点之后、仍属于该句的字符（连续标点、右引号、右括号）
#[inline]
fn is_trailing_closer(ch: char) -> bool {
    is_sentence_delimiter(ch)
        || matches!(ch, '"' | '\'' | '”' | '’' | '»' | ')' | ']' | '」' | '』')
}

/// 小数点（如 3.5）不算句末
#[inline]
fn is_decimal_point(prev: Option<char>, ch: char, next: Option<char>) -> bool {
    ch == '.'
        && prev.map_or(false, |c| c.is_ascii_digit())
        && next.map_or(false, |c| c.is_ascii_digit())
}

/// 把单个段落切成句子
fn split_sentences(paragraph: &str) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut closing = false;

    for (i, &ch) in chars.iter().enumerate() {
        if closing && !is_trailing_closer(ch) {
            push_trimmed(&mut sentences, &current);
            current.clear();
            closing = false;
        }

        current.push(ch);

        let prev = if i > 0 { Some(chars[i - 1]) } else { None };
        let next = chars.get(i + 1).copied();
        if is_sentence_delimiter(ch) && !is_decimal_point(prev, ch, next) {
            closing = true;
        }
    }

    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// 按空行切成段落
///
/// 段落内的换行（硬换行的 .txt）只是普通空白，连续空白压缩为一个空格
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut words: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !words.is_empty() {
                paragraphs.push(words.join(" "));
                words.clear();
            }
            continue;
        }
        words.extend(line.split_whitespace());
    }

    if !words.is_empty() {
        paragraphs.push(words.join(" "));
    }
    paragraphs
}

/// 把文本切成句子序列（先按空行分段落，再按句末标点）
pub fn split_into_sentences(text: &str) -> Vec<String> {
    split_paragraphs(text)
        .iter()
        .flat_map(|paragraph| split_sentences(paragraph))
        .collect()
}

/// 贪心合并句子，直到再加一句会超出 max_chars
fn pack_sentences(sentences: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in sentences {
        let len = sentence.chars().count();

        if current.is_empty() {
            current = sentence;
            current_len = len;
        } else if current_len + 1 + len <= max_chars {
            current.push(JOINER);
            current.push_str(&sentence);
            current_len += 1 + len;
        } else {
            packed.push(std::mem::take(&mut current));
            current = sentence;
            current_len = len;
        }
    }

    if !current.is_empty() {
        packed.push(current);
    }

    packed
}

/// 对文本进行分段
///
/// 分段策略：
/// 1. 按空行分成段落，段落内换行视为空格
/// 2. 每个段落按句末标点切成句子（连续标点和右引号归入前一句）
/// 3. 句子之间以空格连接，贪心装入片段，不超过 max_chars
/// 4. 单句超过 max_chars 时单独成段，不截断
///
/// 结果是确定的：相同输入与配置总是得到相同的片段序列。
/// 空白文本返回空序列。
pub fn segment_text(text: &str, config: &SegmentConfig) -> Vec<Segment> {
    pack_sentences(split_into_sentences(text), config.max_chars)
        .into_iter()
        .enumerate()
        .filter_map(|(index, chunk)| Segment::new(index, chunk, config.max_chars).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Era una noche oscura. La lluvia golpeaba los cristales!\n\
        ¿Quién llama a estas horas? Nadie respondió... El reloj marcó las 3.15 de la madrugada.\n\n\
        \"Abre la puerta.\" Susurró una voz.";

    fn rejoin(segments: &[Segment]) -> Vec<String> {
        segments
            .iter()
            .flat_map(|s| split_into_sentences(s.text()))
            .collect()
    }

    #[test]
    fn test_no_delimiter_yields_single_segment() {
        let segments = segment_text("texto sin puntuación alguna", &SegmentConfig::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text(), "texto sin puntuación alguna");
        assert_eq!(segments[0].index(), 0);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(segment_text("  \n\t \n", &SegmentConfig::default()).is_empty());
    }

    #[test]
    fn test_sentences_are_split_on_delimiters() {
        let sentences = split_into_sentences(SAMPLE);
        assert_eq!(
            sentences,
            vec![
                "Era una noche oscura.",
                "La lluvia golpeaba los cristales!",
                "¿Quién llama a estas horas?",
                "Nadie respondió...",
                "El reloj marcó las 3.15 de la madrugada.",
                "\"Abre la puerta.\"",
                "Susurró una voz.",
            ]
        );
    }

    #[test]
    fn test_round_trip_preserves_every_sentence_in_order() {
        for max_chars in [1, 10, 25, 40, 80, 1000] {
            let config = SegmentConfig { max_chars };
            let segments = segment_text(SAMPLE, &config);
            assert_eq!(rejoin(&segments), split_into_sentences(SAMPLE));
        }
    }

    #[test]
    fn test_segments_respect_budget_unless_single_sentence() {
        let config = SegmentConfig { max_chars: 40 };
        let segments = segment_text(SAMPLE, &config);

        for segment in &segments {
            if segment.char_count() > 40 {
                // 超长片段只能是单独一句
                assert_eq!(split_into_sentences(segment.text()).len(), 1);
            }
        }
        assert!(segments.iter().any(|s| s.text().contains(' ')));
    }

    #[test]
    fn test_oversized_sentence_is_not_truncated() {
        let config = SegmentConfig { max_chars: 10 };
        let segments = segment_text("Corta. Esta frase es mucho más larga que diez. Fin.", &config);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].text(), "Esta frase es mucho más larga que diez.");
        assert!(segments[1].is_oversized());
        assert!(!segments[0].is_oversized());
    }

    #[test]
    fn test_greedy_packing_counts_joiner() {
        // "Uno." (4) + " " + "Dos." (4) = 9
        let segments = segment_text("Uno. Dos. Tres.", &SegmentConfig { max_chars: 9 });
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text(), "Uno. Dos.");
        assert_eq!(segments[1].text(), "Tres.");
        assert_eq!(segments[1].index(), 1);
    }

    #[test]
    fn test_indices_are_contiguous() {
        let segments = segment_text(SAMPLE, &SegmentConfig { max_chars: 30 });
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index(), i);
            assert_eq!(segment.max_length(), 30);
        }
    }

    #[test]
    fn test_segmentation_is_idempotent() {
        let config = SegmentConfig { max_chars: 50 };
        assert_eq!(segment_text(SAMPLE, &config), segment_text(SAMPLE, &config));
    }

    #[test]
    fn test_decimal_point_does_not_split() {
        let sentences = split_into_sentences("Costó 3.50 euros. Barato.");
        assert_eq!(sentences, vec!["Costó 3.50 euros.", "Barato."]);
    }

    #[test]
    fn test_default_config() {
        let segments = segment_text("Contenido de prueba.", &SegmentConfig::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].max_length(), DEFAULT_MAX_CHARS);
    }

    #[test]
    fn test_hard_wrapped_sentence_stays_whole() {
        let segments = segment_text(
            "Uno dos tres cuatro\ncinco seis.",
            &SegmentConfig { max_chars: 20 },
        );
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text(), "Uno dos tres cuatro cinco seis.");
        assert!(segments[0].is_oversized());
    }

    #[test]
    fn test_wrapped_lines_are_joined_within_paragraph() {
        let text = "Había una vez\n  un faro   viejo. Nadie\r\nlo visitaba.\n\nFin del cuento";
        assert_eq!(
            split_into_sentences(text),
            vec![
                "Había una vez un faro viejo.",
                "Nadie lo visitaba.",
                "Fin del cuento",
            ]
        );
    }

    #[test]
    fn test_blank_line_ends_unpunctuated_paragraph() {
        let sentences = split_into_sentences("Capítulo uno\n\nEra de noche.");
        assert_eq!(sentences, vec!["Capítulo uno", "Era de noche."]);
    }
}
