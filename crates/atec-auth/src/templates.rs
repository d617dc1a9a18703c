pub(crate) fn account_verification(base_url: &str, token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; background-color: #f6f6f6; color: #333;">
  <div style="max-width: 600px; margin: 20px auto; background: #fff; border: 1px solid #ddd; border-radius: 8px;">
    <h1 style="background: #4CAF50; color: #fff; padding: 20px; margin: 0; text-align: center;">Account Confirmation</h1>
    <div style="padding: 20px;">
      <p>Thank you for signing up to the Autism Treatment Evaluation Checklist (ATEC) service. To activate your account, click the button below:</p>
      <p style="text-align: center;"><a href="{base_url}?validation_token={token}" style="background: #4CAF50; color: #fff; padding: 10px 20px; border-radius: 5px; text-decoration: none;">Activate Account</a></p>
    </div>
    <p style="background: #f1f1f1; padding: 10px; font-size: 12px; color: #666; text-align: center;">If you did not sign up, ignore this e-mail.</p>
  </div>
</body>
</html>"#
    )
}

pub(crate) fn reset_password(base_url: &str, token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; background-color: #f6f6f6; color: #333;">
  <div style="max-width: 600px; margin: 20px auto; background: #fff; border: 1px solid #ddd; border-radius: 8px;">
    <h1 style="background: #4CAF50; color: #fff; padding: 20px; margin: 0; text-align: center;">Password Reset Request</h1>
    <div style="padding: 20px;">
      <p>We received a request to reset the password of your account. If this was you, click the button below:</p>
      <p style="text-align: center;"><a href="{base_url}?change_password_token={token}" style="background: #4CAF50; color: #fff; padding: 10px 20px; border-radius: 5px; text-decoration: none;">Reset Password</a></p>
    </div>
    <p style="background: #f1f1f1; padding: 10px; font-size: 12px; color: #666; text-align: center;">If this was not you, ignore this e-mail and your password stays unchanged.</p>
  </div>
</body>
</html>"#
    )
}
