use crate::error::ApiError;
use crate::types::Invite;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;

const SUBJECT: &str = "You've been invited to the Church Directory";

/// Rendered invite email.
#[derive(Debug, Clone, PartialEq)]
pub struct InviteEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn signup_link(frontend_url: &str, code: &str) -> String {
    format!("{}/signup?code={}", frontend_url.trim_end_matches('/'), code)
}

pub fn render_invite(invite: &Invite, frontend_url: &str) -> InviteEmail {
    let link = signup_link(frontend_url, &invite.code);
    let expires = invite.expires_at.format("%B %-d, %Y");
    let access = match invite.role {
        crate::types::Role::Admin => "administrator",
        crate::types::Role::User => "member",
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{
            font-family: Georgia, 'Times New Roman', serif;
            line-height: 1.6;
            color: #2d2a26;
            background: #faf8f5;
            margin: 0;
            padding: 0;
        }}
        .wrapper {{
            max-width: 600px;
            margin: 0 auto;
            padding: 48px 20px;
        }}
        .container {{
            background: #ffffff;
            border: 1px solid #e8e2d9;
            padding: 48px 40px;
        }}
        .title {{
            font-size: 22px;
            font-weight: normal;
            margin: 0 0 24px 0;
        }}
        .button {{
            display: inline-block;
            padding: 16px 28px;
            background: #6b4e2e;
            color: #ffffff;
            text-decoration: none;
            font-size: 15px;
        }}
        .code {{
            background: #f4f1ec;
            padding: 12px 16px;
            font-family: 'Courier New', monospace;
            font-size: 13px;
            word-break: break-all;
        }}
        .note {{
            font-size: 13px;
            color: #7a7167;
            margin-top: 32px;
        }}
    </style>
</head>
<body>
    <div class="wrapper">
        <div class="container">
            <h1 class="title">You've been invited</h1>
            <p>You have been given {access} access to the Church Directory. Use the button below to create your account.</p>
            <p><a href="{link}" class="button">Create Account</a></p>
            <p>Or enter this invite code on the signup page:</p>
            <div class="code">{code}</div>
            <p class="note">This invitation is for {email} and expires on {expires}. If you weren't expecting it, you can ignore this email.</p>
        </div>
    </div>
</body>
</html>"#,
        access = access,
        link = link,
        code = invite.code,
        email = invite.email,
        expires = expires,
    );

    let text = format!(
        "You've been invited\n\n\
         You have been given {access} access to the Church Directory. Create your account here:\n\n\
         {link}\n\n\
         Or enter this invite code on the signup page: {code}\n\n\
         This invitation is for {email} and expires on {expires}.",
        access = access,
        link = link,
        code = invite.code,
        email = invite.email,
        expires = expires,
    );

    InviteEmail {
        subject: SUBJECT.to_string(),
        html,
        text,
    }
}

fn content(data: String) -> Result<Content, ApiError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build email content: {}", e)))
}

/// Send an invite email via SES.
pub async fn send_invite_email(
    ses_client: &SesClient,
    sender: &str,
    frontend_url: &str,
    invite: &Invite,
) -> Result<(), ApiError> {
    let rendered = render_invite(invite, frontend_url);

    let body = Body::builder()
        .html(content(rendered.html)?)
        .text(content(rendered.text)?)
        .build();

    let message = Message::builder()
        .subject(content(rendered.subject)?)
        .body(body)
        .build();

    ses_client
        .send_email()
        .from_email_address(sender)
        .destination(Destination::builder().to_addresses(&invite.email).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await
        .map_err(|e| {
            ApiError::Internal(format!(
                "Failed to send email: {}",
                aws_sdk_sesv2::error::DisplayErrorContext(&e)
            ))
        })?;

    Ok(())
}
