/// HTML template for broadcast emails
use crate::validation::sanitize;

/// Prepare free text for the HTML body: sanitized, CR stripped, LF as `<br>`
fn body_text(text: &str) -> String {
    sanitize(&text.replace('\r', "")).replace('\n', "<br>")
}

/// Render the branded message for one recipient
///
/// Every interpolated value is sanitized here, whatever the caller did.
pub fn render_broadcast(subject: &str, recipient_name: &str, content: &str) -> String {
    let subject = sanitize(subject);
    let name = match recipient_name.trim() {
        "" => "there".to_string(),
        name => sanitize(name),
    };
    let content = body_text(content);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{subject}</title>
</head>
<body style="margin:0;padding:0;background-color:#f4f5f7;font-family:Arial,Helvetica,sans-serif;color:#1f2933;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="background-color:#f4f5f7;padding:24px 0;">
    <tr>
      <td align="center">
        <table role="presentation" width="600" cellspacing="0" cellpadding="0" style="background-color:#ffffff;border-radius:8px;overflow:hidden;">
          <tr>
            <td style="background-color:#1d4ed8;padding:24px 32px;color:#ffffff;">
              <h1 style="margin:0;font-size:20px;font-weight:bold;">{subject}</h1>
            </td>
          </tr>
          <tr>
            <td style="padding:32px;font-size:15px;line-height:1.6;">
              <p style="margin:0 0 16px 0;">Hello {name},</p>
              <div style="margin:0 0 24px 0;">{content}</div>
              <p style="margin:0;">Best regards,<br>The Admin Team</p>
            </td>
          </tr>
          <tr>
            <td style="padding:16px 32px;background-color:#f9fafb;font-size:12px;color:#6b7280;">
              This message was sent to members of your pillar by an administrator.
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>
"#
    )
}
