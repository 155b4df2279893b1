//! Prompt templates for character utterances and memory summaries.
//!
//! Templates use `{key}` placeholders filled by [`render_template`]. The
//! villagers speak Turkish, so the prompts do too.

/// Version tag of the built-in templates.
pub const TEMPLATE_VERSION: &str = "1.0";

/// Persona and rules for a speaking character.
pub const UTTERANCE_SYSTEM: &str = r"Sen {speaker_name} isimli bir karaktersin.

KARAKTER BİLGİLERİN:
- Yaş: {speaker_age}
- Kişilik: {speaker_traits}
- İlgi alanları: {speaker_interests}
- Korkuları: {speaker_fears}
- Hedefleri: {speaker_goals}
- Mevcut ihtiyaçların: {speaker_needs}

KONUŞMA KURALLARI:
- Kişiliğine uygun konuş ({speaker_traits}).
- Çevreyi, gördüklerini, hissettiklerini anlat.
- KAYNAK PAYLAŞIMI: Bildiğin su/gıda/barınak konumu varsa ve karşındakinin ihtiyacı varsa, konumu (x, y) biçiminde paylaş.
- Bir kaynağa ihtiyacın varsa, konumunu biliyor mu diye sor.
- Su ve gıda çok değerli, birbirinize yardım edin.
- Doğal ve samimi ol, 2-3 cümle ile sınırla.
- Türkçe konuş.";

/// Situation, partner, memories and history for one turn.
pub const UTTERANCE_USER: &str = r"KONUŞMA PARTNERİN {listener_name}:
- Yaş: {listener_age}
- Kişilik: {listener_traits}
- İlgi alanları: {listener_interests}
- İhtiyaçları: {listener_needs}

MEVCUT DURUM:
- Konum: {speaker_position}
- {context}
{memories}{resources}{shared}{history}
{instruction}

Cevabın:";

/// Instruction for the opening turn.
pub const OPENING_INSTRUCTION: &str =
    "Bu konuşmayı sen başlatıyorsun. Sıcak bir selamlama yap, kendini tanıt ve {listener_name} hakkında sorular sor.";

/// Instruction for every later turn.
pub const REPLY_INSTRUCTION: &str = r#"{listener_name}'in son sözüne DOĞRUDAN cevap ver, konuyu geliştir.
SON SÖYLENEN: "{last_line}""#;

/// Summarizer persona.
pub const SUMMARY_SYSTEM: &str =
    "Sen kısa ve doğru özetler çıkaran bir yardımcısın. Yalnızca özeti yaz.";

/// Summarizer input.
pub const SUMMARY_USER: &str = r"Aşağıdaki anının 1-2 cümlelik kısa özetini çıkar:

{text}

Özet:";

/// Replace every `{key}` in `template` with its value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Turkish label of a need.
#[must_use]
pub fn translate_need(need: &str) -> &str {
    match need {
        "hunger" => "açlık",
        "thirst" => "susuzluk",
        "energy" => "enerji",
        "social" => "sosyallik",
        other => other,
    }
}

/// `"açlık: 45/100, susuzluk: 80/100, ..."`.
#[must_use]
pub fn format_needs(needs: &[(&str, f32)]) -> String {
    needs
        .iter()
        .map(|(name, value)| format!("{}: {}/100", translate_need(name), value.round()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A titled bullet list preceded by a blank line, or `empty` when there are
/// no items.
#[must_use]
pub fn format_section(title: &str, items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let mut out = format!("\n{title}:\n");
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_all_occurrences() {
        let out = render_template("{a} ve {a}, {b}", &[("a", "su"), ("b", "ekmek")]);
        assert_eq!(out, "su ve su, ekmek");
    }

    #[test]
    fn needs_are_translated_and_rounded() {
        let s = format_needs(&[("hunger", 44.6), ("social", 80.0)]);
        assert_eq!(s, "açlık: 45/100, sosyallik: 80/100");
    }

    #[test]
    fn empty_section_uses_placeholder() {
        assert_eq!(format_section("ANILAR", &[], ""), "");
        let s = format_section("ANILAR", &["göl gördüm".to_string()], "");
        assert!(s.contains("ANILAR:\n- göl gördüm"));
    }
}
